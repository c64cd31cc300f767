//! Stderr logger for the tracker crates.
//!
//! Lines look like `[  1.234s  INFO boardwatch_moves] 1 e4`. Records from
//! other crates only get through at `warn` and above, so a `debug` run shows
//! the tracker's own decisions without dependency chatter.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable read by [`init_from_env`] and [`init_tracing`].
pub const LOG_ENV: &str = "BOARDWATCH_LOG";

const OWN_TARGET_PREFIX: &str = "boardwatch";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl StderrLogger {
    fn new(level: LevelFilter) -> Self {
        Self {
            level,
            started: Instant::now(),
        }
    }

    fn accepts(&self, target: &str, level: Level) -> bool {
        level <= self.level && (target.starts_with(OWN_TARGET_PREFIX) || level <= Level::Warn)
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.accepts(metadata.target(), metadata.level())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let krate = record.target().split("::").next().unwrap_or_default();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            self.started.elapsed().as_secs_f64(),
            record.level(),
            krate,
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger. Later calls are no-ops.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger::new(level));
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install the stderr logger at the level named by `BOARDWATCH_LOG`
/// (`off`, `error` … `trace`), `info` when unset or unparsable.
pub fn init_from_env() -> Result<LevelFilter, log::SetLoggerError> {
    let level = level_from(std::env::var(LOG_ENV).ok().as_deref());
    init_with_level(level)?;
    Ok(level)
}

fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Output style of the `tracing` subscriber.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable lines with uptime timestamps.
    #[default]
    Pretty,
    /// One flattened JSON object per event.
    Json,
}

/// Install a `tracing` subscriber filtered by `BOARDWATCH_LOG` (default
/// `info`). Span close events carry their timings.
#[cfg(feature = "tracing")]
pub fn init_tracing(format: TracingFormat) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let _ = match format {
        TracingFormat::Json => builder.json().flatten_event(true).finish().try_init(),
        TracingFormat::Pretty => builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_targets_are_limited_to_warnings() {
        let logger = StderrLogger::new(LevelFilter::Debug);
        assert!(logger.accepts("boardwatch_moves::inference", Level::Debug));
        assert!(!logger.accepts("boardwatch_board", Level::Trace));
        assert!(!logger.accepts("shakmaty", Level::Info));
        assert!(logger.accepts("shakmaty", Level::Warn));
    }

    #[test]
    fn env_value_parsing_falls_back_to_info() {
        assert_eq!(level_from(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from(Some(" TRACE ")), LevelFilter::Trace);
        assert_eq!(level_from(Some("off")), LevelFilter::Off);
        assert_eq!(level_from(Some("loud")), LevelFilter::Info);
        assert_eq!(level_from(None), LevelFilter::Info);
    }
}
