use anstream::ColorChoice;
use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_tree::HierarchicalLayer;
use tracing_tree::time::Uptime;

use fixup_logging::FixupFormat;
use fixup_static::EnvVars;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    /// Suppress all tracing output by default (overridable by `RUST_LOG`).
    #[default]
    Default,
    /// Show debug messages by default (overridable by `RUST_LOG`).
    Verbose,
    /// Show messages in a hierarchical span tree. By default, debug messages are shown (overridable by `RUST_LOG`).
    ExtraVerbose,
}

impl From<u8> for Level {
    fn from(verbose: u8) -> Self {
        match verbose {
            0 => Self::Default,
            1 => Self::Verbose,
            _ => Self::ExtraVerbose,
        }
    }
}

/// Configure `tracing` based on the given [`Level`], taking into account the `RUST_LOG` environment
/// variable.
///
/// The [`Level`] is used to dictate the default filters (which can be overridden by the `RUST_LOG`
/// environment variable) along with the formatting of the output. For example, [`Level::Verbose`]
/// shows the per-object decisions of the walk and the patch phases.
pub(crate) fn setup_logging(level: Level) -> anyhow::Result<()> {
    let (directives, from_env) = match std::env::var(EnvVars::RUST_LOG) {
        Ok(directives) => (directives, true),
        Err(_) => match level {
            // Show nothing, but allow `RUST_LOG` to override.
            Level::Default => ("off".to_string(), false),
            Level::Verbose | Level::ExtraVerbose => (
                "fixup=debug,fixup_bundle=debug,fixup_macho=debug".to_string(),
                false,
            ),
        },
    };
    let filter = EnvFilter::builder()
        .parse(&directives)
        .context("Invalid RUST_LOG directives")?;

    match level {
        Level::Default | Level::Verbose => {
            let ansi = match anstream::Stderr::choice(&std::io::stderr()) {
                ColorChoice::Always | ColorChoice::AlwaysAnsi => true,
                ColorChoice::Never | ColorChoice::Auto => false,
            };
            // Timestamps only when `RUST_LOG` is set explicitly.
            let format = FixupFormat {
                display_timestamp: from_env,
                ..FixupFormat::default()
            };
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .event_format(format)
                        .with_writer(std::io::stderr)
                        .with_ansi(ansi)
                        .with_filter(filter),
                )
                .try_init()?;
        }
        Level::ExtraVerbose => {
            // Regardless of the tracing level, include the uptime and target for each message.
            tracing_subscriber::registry()
                .with(
                    HierarchicalLayer::default()
                        .with_targets(true)
                        .with_timer(Uptime::default())
                        .with_writer(std::io::stderr)
                        .with_filter(filter),
                )
                .try_init()?;
        }
    }

    Ok(())
}
