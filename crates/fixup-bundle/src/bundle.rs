use crate::patch::{self, PatchOptions, PatchReport};
use crate::{Error, Platform, WalkReport, Walker};

/// The outcome of fixing a bundle.
#[derive(Debug)]
pub struct FixReport {
    pub walk: WalkReport,
    pub patch: PatchReport,
}

/// Make the bundle self-contained: copy every missing dependency into it, then rewrite every
/// binary to reference only the bundle.
///
/// Nothing is rolled back on failure; files copied or rewritten before the error stay in place.
pub fn fix_bundle(platform: &dyn Platform, options: &PatchOptions) -> Result<FixReport, Error> {
    let walk = Walker::new().walk(platform)?;
    let patch = patch::patch(platform, options)?;
    Ok(FixReport { walk, patch })
}

/// Compute the rewrites the bundle still needs, without changing anything.
pub fn verify_bundle(platform: &dyn Platform) -> Result<PatchReport, Error> {
    patch::patch(
        platform,
        &PatchOptions {
            dry_run: true,
            ..PatchOptions::default()
        },
    )
}
