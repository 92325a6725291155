use std::fmt::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use tracing::debug;

use fixup_bundle::{Backend, BundleContext, Platform, PlatformOptions, RewritePlan};
use fixup_fs::Simplified;

pub(crate) use classify::classify;
pub(crate) use fix::fix;
pub(crate) use inspect::inspect;
pub(crate) use verify::verify;

mod classify;
mod fix;
mod inspect;
mod verify;

#[derive(Copy, Clone)]
pub(crate) enum ExitStatus {
    /// The command succeeded.
    Success,

    /// The command failed due to an error in the user input, or found a bundle that still needs
    /// to be fixed.
    Failure,

    /// The command failed with an unexpected error.
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => Self::from(0),
            ExitStatus::Failure => Self::from(1),
            ExitStatus::Error => Self::from(2),
        }
    }
}

/// Format a duration as a human-readable string, Cargo-style.
pub(super) fn elapsed(duration: Duration) -> String {
    let secs = duration.as_secs();
    let ms = duration.subsec_millis();

    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:02}s", secs, duration.subsec_nanos() / 10_000_000)
    } else if ms > 0 {
        format!("{ms}ms")
    } else {
        format!("0.{:02}ms", duration.subsec_nanos() / 10_000)
    }
}

/// Read the manifest and create the platform for the bundle it describes.
pub(super) fn bundle_platform(
    manifest: &Path,
    backend: Backend,
    options: &PlatformOptions,
) -> anyhow::Result<Box<dyn Platform>> {
    let context = BundleContext::from_path(manifest)?;
    debug!(
        "Fixing up `{}` as a {backend} bundle",
        context.app_dir.simplified_display()
    );
    Ok(backend.platform(context, options)?)
}

/// Write the edits of each plan, with `install_name_tool`-style flags.
pub(super) fn write_plans(
    plans: &[RewritePlan],
    app_dir: &Path,
    mut writer: impl Write,
) -> std::fmt::Result {
    for plan in plans {
        let object = plan.object.strip_prefix(app_dir).unwrap_or(&plan.object);
        writeln!(writer, "{}", object.simplified_display())?;
        if let Some(id) = &plan.edits.set_id {
            writeln!(writer, "  -id {id}")?;
        }
        for hint in &plan.edits.delete_hints {
            writeln!(writer, "  -delete_rpath {hint}")?;
        }
        for hint in &plan.edits.add_hints {
            writeln!(writer, "  -add_rpath {hint}")?;
        }
        for (old, new) in &plan.edits.change_references {
            writeln!(writer, "  -change {old} {new}")?;
        }
    }
    Ok(())
}
