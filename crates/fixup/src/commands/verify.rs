use std::fmt::Write;
use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;

use fixup_bundle::{Backend, PlatformOptions, verify_bundle};

use crate::commands::{ExitStatus, bundle_platform, write_plans};
use crate::printer::Printer;

/// Report the rewrites the bundle still needs.
pub(crate) fn verify(
    manifest: &Path,
    backend: Backend,
    options: &PlatformOptions,
    printer: Printer,
) -> Result<ExitStatus> {
    let platform = bundle_platform(manifest, backend, options)?;
    let report = verify_bundle(platform.as_ref())?;

    let objects = report.objects;
    let s = if objects == 1 { "y" } else { "ies" };
    if report.plans.is_empty() {
        writeln!(
            printer.stderr(),
            "{}",
            format!(
                "Verified {}: every reference stays inside the bundle",
                format!("{objects} binar{s}").bold()
            )
            .dimmed()
        )?;
        return Ok(ExitStatus::Success);
    }

    write_plans(&report.plans, &platform.context().app_dir, printer.stdout())?;
    writeln!(
        printer.stderr(),
        "{} {} of {objects} binar{s} still need to be rewritten",
        "error:".red().bold(),
        report.plans.len().to_string().bold()
    )?;
    Ok(ExitStatus::Failure)
}
