use std::fmt::Write;
use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;

use fixup_bundle::{Backend, Classification, PlatformOptions};

use crate::commands::{ExitStatus, bundle_platform};
use crate::printer::Printer;

/// Print where each reference would be placed in the bundle.
///
/// References that cannot be bundled are reported alongside the others, and fail the command.
pub(crate) fn classify(
    manifest: &Path,
    references: &[String],
    backend: Backend,
    options: &PlatformOptions,
    printer: Printer,
) -> Result<ExitStatus> {
    let platform = bundle_platform(manifest, backend, options)?;

    let mut status = ExitStatus::Success;
    for reference in references {
        match platform.classify(reference) {
            Ok(Classification::Bundled(bundled)) => {
                writeln!(printer.stdout(), "{reference} -> {}", bundled.cyan())?;
            }
            Ok(Classification::Ignore) => {
                writeln!(printer.stdout(), "{reference} {}", "(system)".dimmed())?;
            }
            Err(err) => {
                writeln!(printer.stdout(), "{reference} {} {err}", "error:".red().bold())?;
                status = ExitStatus::Failure;
            }
        }
    }

    Ok(status)
}
