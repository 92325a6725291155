use std::fmt::Write;
use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use owo_colors::OwoColorize;

use fixup_bundle::{Backend, PatchOptions, PlatformOptions, fix_bundle};
use fixup_fs::Simplified;

use crate::commands::{ExitStatus, bundle_platform, elapsed, write_plans};
use crate::printer::Printer;

/// Copy the missing dependencies into the bundle and rewrite its binaries.
pub(crate) fn fix(
    manifest: &Path,
    backend: Backend,
    options: &PlatformOptions,
    patch_options: PatchOptions,
    printer: Printer,
) -> Result<ExitStatus> {
    let start = Instant::now();
    let platform = bundle_platform(manifest, backend, options)?;
    let app_dir = &platform.context().app_dir;

    let report = fix_bundle(platform.as_ref(), &patch_options)?;

    let copied = report.walk.copied.len();
    let s = if copied == 1 { "y" } else { "ies" };
    writeln!(
        printer.stderr(),
        "{}",
        format!(
            "Copied {} into {}",
            format!("{copied} dependenc{s}").bold(),
            app_dir.simplified_display().cyan()
        )
        .dimmed()
    )?;

    let planned = report.patch.plans.len();
    let objects = report.patch.objects;
    let s = if objects == 1 { "y" } else { "ies" };
    if patch_options.dry_run {
        write_plans(&report.patch.plans, app_dir, printer.stdout())?;
        writeln!(
            printer.stderr(),
            "{}",
            format!(
                "Would rewrite {} of {objects} binar{s}",
                planned.to_string().bold(),
            )
            .dimmed()
        )?;
    } else {
        writeln!(
            printer.stderr(),
            "{}",
            format!(
                "Rewrote {} of {objects} binar{s} {}",
                report.patch.rewritten.to_string().bold(),
                format!("in {}", elapsed(start.elapsed())).dimmed()
            )
            .dimmed()
        )?;
    }

    Ok(ExitStatus::Success)
}
