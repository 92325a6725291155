use std::fmt;

use jiff::Timestamp;
use owo_colors::OwoColorize;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// The style of a fixup logging line.
///
/// Fixing a bundle runs in two phases, each in its own span (`walk`, then `patch`). With
/// `display_phase`, every event is tagged with the outermost span it was raised in, so that the
/// per-object messages of the two phases can be told apart:
///
/// ```text
/// DEBUG [walk] Bundled `@rpath/libCTK.dylib` as Slicer.app/Contents/lib/Slicer-5.6/libCTK.dylib
/// DEBUG [patch] Rewriting Slicer.app/Contents/MacOS/Slicer
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixupFormat {
    pub display_timestamp: bool,
    pub display_level: bool,
    pub display_phase: bool,
}

impl Default for FixupFormat {
    fn default() -> Self {
        Self {
            display_timestamp: false,
            display_level: true,
            display_phase: true,
        }
    }
}

impl<S, N> FormatEvent<S, N> for FixupFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let ansi = writer.has_ansi_escapes();

        if self.display_timestamp {
            let now = Timestamp::now();
            if ansi {
                write!(writer, "{} ", now.dimmed())?;
            } else {
                write!(writer, "{now} ")?;
            }
        }

        if self.display_level {
            let level = event.metadata().level();
            if ansi {
                match *level {
                    tracing::Level::TRACE => write!(writer, "{} ", level.purple())?,
                    tracing::Level::DEBUG => write!(writer, "{} ", level.blue())?,
                    tracing::Level::INFO => write!(writer, "{} ", level.green())?,
                    tracing::Level::WARN => write!(writer, "{} ", level.yellow())?,
                    tracing::Level::ERROR => write!(writer, "{} ", level.red())?,
                }
            } else {
                write!(writer, "{level} ")?;
            }
        }

        if self.display_phase {
            let phase = event
                .parent()
                .and_then(|id| ctx.span(id))
                .or_else(|| ctx.lookup_current())
                .and_then(|span| span.scope().from_root().next())
                .map(|span| span.metadata().name());
            if let Some(phase) = phase {
                let phase = format!("[{phase}]");
                if ansi {
                    write!(writer, "{} ", phase.bold())?;
                } else {
                    write!(writer, "{phase} ")?;
                }
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
