use std::fmt::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use fixup_bundle::ReaderKind;
use fixup_cli::ToolArgs;
use fixup_fs::Simplified;
use fixup_macho::{LoadCommandReader, Native, Otool};

use crate::commands::ExitStatus;
use crate::printer::Printer;

/// Print the load commands of each binary.
pub(crate) fn inspect(
    binaries: &[PathBuf],
    tools: &ToolArgs,
    printer: Printer,
) -> Result<ExitStatus> {
    let reader: Box<dyn LoadCommandReader> = match tools.reader {
        ReaderKind::Otool => Box::new(
            tools
                .otool
                .clone()
                .map_or_else(Otool::default, Otool::new),
        ),
        ReaderKind::Native => Box::new(Native),
    };

    let mut stdout = printer.stdout();
    for binary in binaries {
        let commands = reader
            .read(binary)
            .with_context(|| format!("Failed to inspect `{}`", binary.simplified_display()))?;

        writeln!(stdout, "{}", binary.simplified_display().bold())?;
        if let Some(id) = &commands.install_id {
            writeln!(stdout, "  id: {id}")?;
        }
        for dependency in &commands.dependencies {
            writeln!(stdout, "  dependency: {dependency}")?;
        }
        for rpath in &commands.rpaths {
            writeln!(stdout, "  rpath: {rpath}")?;
        }
    }

    Ok(ExitStatus::Success)
}
