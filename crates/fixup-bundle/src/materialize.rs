use std::path::Path;

use tracing::debug;

use fixup_fs::{Simplified, copy_dir_preserving_symlinks, is_within};
use fixup_warnings::warn_user_once;

use crate::Error;

/// The outcome of placing a dependency into the bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Materialized {
    Copied,
    AlreadyPresent,
}

/// Copy `source` to `target` inside the bundle rooted at `bundle`.
///
/// Files are copied directly; directories are copied recursively with symbolic links preserved.
/// An existing target is left as-is.
pub fn materialize(source: &Path, target: &Path, bundle: &Path) -> Result<Materialized, Error> {
    if !is_within(target, bundle) {
        return Err(Error::TargetOutsideBundle {
            target: target.to_path_buf(),
            bundle: bundle.to_path_buf(),
        });
    }

    if target.exists() || target.is_symlink() {
        if is_same_file(source, target) {
            debug!("Dependency is already in place: {}", target.simplified_display());
        } else {
            warn_user_once!(
                "Skipping copy of `{}`: `{}` already exists",
                source.simplified_display(),
                target.simplified_display()
            );
        }
        return Ok(Materialized::AlreadyPresent);
    }

    debug!(
        "Copying {} to {}",
        source.simplified_display(),
        target.simplified_display()
    );

    if let Some(parent) = target.parent() {
        fs_err::create_dir_all(parent)?;
    }

    if source.is_file() {
        fs_err::copy(source, target)?;
    } else if source.is_dir() {
        copy_dir_preserving_symlinks(source, target)?;
    } else {
        return Err(Error::UnsupportedDependencyType {
            dependency: source.to_path_buf(),
            target: target.to_path_buf(),
        });
    }

    Ok(Materialized::Copied)
}

fn is_same_file(left: &Path, right: &Path) -> bool {
    match (fs_err::canonicalize(left), fs_err::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => false,
    }
}
