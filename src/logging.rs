//! Logging setup for host programs.
//!
//! The library only emits structured `tracing` events (mount ids, entry
//! names, frame timestamps, cache sizes); installing a subscriber is the
//! host's choice. [`init_logging`] wires one suited to this workload: a
//! mount can stay up for days while an editor scrubs through it, so the
//! file sink rolls daily instead of truncating on launch, and the FUSE
//! session loop (which traces every kernel callback) is quieted to
//! warnings unless `RUST_LOG` says otherwise.

use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default directive set: library events at info, `fuser` damped to
/// warnings so per-callback chatter stays out of the log.
const DEFAULT_DIRECTIVES: &str = "info,fuser=warn";

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    dir: PathBuf,
    file_prefix: String,
    console: bool,
    directives: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("logs"),
            file_prefix: "mcrawfs".to_string(),
            console: true,
            directives: DEFAULT_DIRECTIVES.to_string(),
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory the rolling log files are written under.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    /// File name prefix; the date suffix is appended per day.
    pub fn with_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    /// Also mirror events to stderr. GUI hosts typically turn this off.
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Filter directives used when `RUST_LOG` is not set.
    pub fn with_directives(mut self, directives: impl Into<String>) -> Self {
        self.directives = directives.into();
        self
    }

    pub fn directives(&self) -> &str {
        &self.directives
    }

    pub fn log_dir(&self) -> &Path {
        &self.dir
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.directives))
    }
}

/// Keeps the file writer alive; dropping it flushes and closes the log.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Install the global subscriber described by `config`.
///
/// Fails if the log directory cannot be created, or when a subscriber is
/// already installed for this process.
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard, io::Error> {
    std::fs::create_dir_all(&config.dir)?;

    let file_appender =
        tracing_appender::rolling::daily(&config.dir, format!("{}.log", config.file_prefix));
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);

    // Events go to stderr so projected file contents piped from stdout
    // stay clean.
    let console_layer = config
        .console
        .then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr).compact());

    tracing_subscriber::registry()
        .with(config.filter())
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
