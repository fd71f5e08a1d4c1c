//! Stderr logger for tools and tests.
//!
//! Lines look like `[  0.012s DEBUG markers] message`, with the `bubblesheet_`
//! prefix dropped from the stage column. Records from other crates are capped
//! at `warn` so a debug run shows only the scan stages.
//!
//! Install once with [`init_with_level`] or [`init_from_env`]
//! (`BUBBLESHEET_LOG=debug`). With the `tracing` feature, [`init_tracing`]
//! installs a `tracing-subscriber` instead.

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

/// Environment variable read by [`init_from_env`].
pub const LOG_ENV: &str = "BUBBLESHEET_LOG";

const CRATE_PREFIX: &str = "bubblesheet";

struct StageLogger {
    level: LevelFilter,
    started: Instant,
}

/// Stage column for a record target: `bubblesheet_markers::detect` → `markers`,
/// the facade → `pipeline`, anything else → its crate name.
fn stage_of(target: &str) -> Option<&str> {
    let krate = target.split("::").next().unwrap_or(target);
    let stage = krate.strip_prefix(CRATE_PREFIX)?;
    Some(match stage.strip_prefix('_') {
        Some(rest) if !rest.is_empty() => rest,
        _ => "pipeline",
    })
}

impl StageLogger {
    fn admits(&self, level: Level, target: &str) -> bool {
        if stage_of(target).is_some() {
            level <= self.level
        } else {
            level <= self.level.min(LevelFilter::Warn)
        }
    }
}

impl Log for StageLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.admits(metadata.level(), metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let target = record.target();
        let column = stage_of(target).unwrap_or_else(|| target.split("::").next().unwrap_or(""));
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            column,
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<StageLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Only the first call installs; later calls are no-ops.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StageLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Parse a level name (`off`, `error` .. `trace`, case-insensitive).
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}

/// Install the stderr logger at the level named by `BUBBLESHEET_LOG`, or
/// `default` when it is unset or unparsable.
pub fn init_from_env(default: LevelFilter) -> Result<(), log::SetLoggerError> {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(default);
    init_with_level(level)
}

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG` (default `info`).
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}
