//! Log output in the `[<timestamp>] [<LEVEL>] <message>` line format.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
        }
    }
}

/// Line prefix for a log record.
pub fn line_prefix(at: DateTime<Utc>, level: &Level) -> String {
    format!(
        "[{}] [{}] ",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        level
    )
}

/// Event formatter that writes one prefixed line per record.
#[derive(Debug, Default, Clone, Copy)]
pub struct OutputChannelFormat;

impl<S, N> FormatEvent<S, N> for OutputChannelFormat
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
        write!(writer, "{}", line_prefix(Utc::now(), event.metadata().level()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Filter directive for the configured verbosity. Warnings ride along with `info`.
pub fn filter_directive(level: LogLevel) -> String {
    let level: Level = level.into();
    format!("s3_image_paste={}", level.as_str().to_lowercase())
}

/// Installs the global subscriber on stderr. `RUST_LOG` takes precedence.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(level)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .event_format(OutputChannelFormat)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
