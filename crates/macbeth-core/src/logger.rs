//! Stderr logging for the CLI and test harnesses.
//!
//! `MACBETH_LOG` takes a default level optionally followed by per-target
//! overrides, e.g. `info,macbeth_chart=trace`. The same string works as a
//! `tracing-subscriber` filter when the `tracing` feature is on. Records look
//! like `[  0.012s DEBUG macbeth_chart::detector] message`.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable read by [`init_from_env`] and `init_tracing`.
pub const LOG_ENV: &str = "MACBETH_LOG";

/// Level per log target, with a fallback for everything else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter {
    default: LevelFilter,
    targets: Vec<(String, LevelFilter)>,
}

impl LogFilter {
    pub fn new(default: LevelFilter) -> Self {
        Self {
            default,
            targets: Vec::new(),
        }
    }

    /// Override the level of `target` and its submodules.
    pub fn with_target(mut self, target: impl Into<String>, level: LevelFilter) -> Self {
        self.targets.push((target.into(), level));
        self
    }

    /// Parse `level` / `target=level` items separated by commas. Items that
    /// do not parse are skipped; a bare level replaces `default`.
    pub fn parse(spec: &str, default: LevelFilter) -> Self {
        let mut filter = Self::new(default);
        for item in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item.split_once('=') {
                Some((target, level)) => {
                    if let Ok(level) = LevelFilter::from_str(level.trim()) {
                        filter = filter.with_target(target.trim(), level);
                    }
                }
                None => {
                    if let Ok(level) = LevelFilter::from_str(item) {
                        filter.default = level;
                    }
                }
            }
        }
        filter
    }

    /// Level for a record target; the longest matching override wins.
    pub fn level_for(&self, target: &str) -> LevelFilter {
        self.targets
            .iter()
            .filter(|(prefix, _)| {
                target == prefix.as_str()
                    || target
                        .strip_prefix(prefix.as_str())
                        .is_some_and(|rest| rest.starts_with("::"))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map_or(self.default, |(_, level)| *level)
    }

    /// Most verbose level any target can reach.
    pub fn max_level(&self) -> LevelFilter {
        self.targets
            .iter()
            .map(|(_, level)| *level)
            .fold(self.default, Ord::max)
    }
}

struct StderrLogger {
    filter: LogFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter.level_for(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Route `log` records to stderr through `filter`.
///
/// The first installed filter stays in place for the life of the process.
pub fn init_with_filter(filter: LogFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let max = filter.max_level();
        let logger = LOGGER.get_or_init(|| StderrLogger {
            filter,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(max);
    }
    Ok(())
}

/// Same level for every target.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    init_with_filter(LogFilter::new(level))
}

/// Filter from `MACBETH_LOG`, or `default` for everything when unset.
pub fn init_from_env(default: LevelFilter) -> Result<(), log::SetLoggerError> {
    let filter = std::env::var(LOG_ENV)
        .map(|spec| LogFilter::parse(&spec, default))
        .unwrap_or_else(|_| LogFilter::new(default));
    init_with_filter(filter)
}

/// Install a `tracing` subscriber with span close events. The filter comes
/// from `MACBETH_LOG`, then `RUST_LOG`, then `info`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);
    if json {
        let _ = builder.json().flatten_event(true).finish().try_init();
    } else {
        let _ = builder
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}
