use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use fixup_bundle::{Backend, PatchOptions};
use fixup_cli::{Cli, Commands, GlobalArgs};
use fixup_warnings::write_error_chain;

use crate::commands::ExitStatus;
use crate::printer::Printer;

mod commands;
mod logging;
mod printer;

fn run(cli: Cli) -> Result<ExitStatus> {
    let GlobalArgs {
        quiet,
        verbose,
        color,
        platform,
    } = cli.global_args;

    anstream::ColorChoice::write_global(color.into());

    // Configure the `tracing` crate, which controls internal logging.
    logging::setup_logging(logging::Level::from(verbose))?;

    // Configure the `Printer`, which controls user-facing output in the CLI.
    let printer = if quiet {
        Printer::Quiet
    } else if verbose > 0 {
        Printer::Verbose
    } else {
        Printer::Default
    };

    // Configure the `warn!` macros, which control user-facing warnings in the CLI.
    if !quiet {
        fixup_warnings::enable();
    }

    let backend = platform.unwrap_or_else(Backend::detect);
    debug!("fixup {} ({backend})", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Fix(args) => {
            let patch_options = PatchOptions {
                dry_run: args.dry_run,
                concurrency: args
                    .jobs
                    .unwrap_or_else(|| PatchOptions::default().concurrency),
            };
            let options = args.bundle.options(args.adhoc_sign);
            commands::fix(&args.manifest, backend, &options, patch_options, printer)
        }
        Commands::Verify(args) => {
            let options = args.bundle.options(false);
            commands::verify(&args.manifest, backend, &options, printer)
        }
        Commands::Inspect(args) => commands::inspect(&args.binaries, &args.tools, printer),
        Commands::Classify(args) => {
            let options = args.bundle.options(false);
            commands::classify(&args.manifest, &args.references, backend, &options, printer)
        }
    }
}

/// Invalid manifests are user errors, like invalid arguments.
fn exit_status(err: &anyhow::Error) -> ExitStatus {
    if matches!(
        err.downcast_ref::<fixup_bundle::Error>(),
        Some(fixup_bundle::Error::Manifest(_))
    ) {
        ExitStatus::Failure
    } else {
        ExitStatus::Error
    }
}

/// The main entry point for the `fixup` binary.
pub fn main<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version requests are printed to stdout and succeed.
            let status = if err.use_stderr() {
                ExitStatus::Failure
            } else {
                ExitStatus::Success
            };
            if let Err(err) = err.print() {
                debug!("Failed to print the usage: {err}");
            }
            return status.into();
        }
    };

    match run(cli) {
        Ok(status) => status.into(),
        Err(err) => {
            let status = exit_status(&err);
            let mut message = String::new();
            if write_error_chain(err.as_ref(), &mut message).is_ok() {
                #[allow(clippy::print_stderr)]
                {
                    anstream::eprint!("{message}");
                }
            }
            status.into()
        }
    }
}
