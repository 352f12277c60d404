//! Logging
//!
//! Everything logs through `tracing`. [`Logger`] is the per-facade handle:
//! it tags each event with a worker id, and facades hold it as
//! `Option<Logger>` so that "no logger" is a silent no-op.

use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log level of a facade message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    /// Step-by-step tracing
    #[default]
    Debug,
    /// Notable progress
    Info,
    /// Recoverable oddities
    Warning,
    /// Failures, including swallowed ones
    Exception,
}

impl Level {
    /// Level name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Exception => "EXCEPTION",
        }
    }

    /// `tracing` filter directive for this level
    pub const fn directive(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Exception => "error",
        }
    }
}

/// Named log handle, cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    id: Arc<str>,
}

impl Logger {
    /// Logger tagged with an arbitrary id
    pub fn new(id: impl AsRef<str>) -> Self {
        Self {
            id: Arc::from(id.as_ref()),
        }
    }

    /// Logger tagged `WORKER-NN`
    pub fn worker(index: usize) -> Self {
        Self::new(format!("WORKER-{index:02}"))
    }

    /// The tag
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Emit `message` at `level`
    pub fn log(&self, level: Level, message: &str) {
        let worker = &*self.id;
        match level {
            Level::Debug => tracing::debug!(worker, "{}", message),
            Level::Info => tracing::info!(worker, "{}", message),
            Level::Warning => tracing::warn!(worker, "{}", message),
            Level::Exception => tracing::error!(worker, "{}", message),
        }
    }
}

/// Log through an optional logger
pub fn log(logger: Option<&Logger>, level: Level, message: &str) {
    if let Some(logger) = logger {
        logger.log(level, message);
    }
}

/// Subscriber setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Minimum level (default: INFO); `RUST_LOG` overrides it when set
    pub level: Level,
    /// Write to stderr (default: true)
    pub to_console: bool,
    /// Also write to this file
    pub file: Option<PathBuf>,
    /// Truncate `file` instead of appending (default: false)
    pub overwrite: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            to_console: true,
            file: None,
            overwrite: false,
        }
    }
}

/// Install the global subscriber described by `config`.
///
/// Fails if the log file cannot be opened or a global subscriber is already set.
pub fn init(config: &LogConfig) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.directive()));

    let console = config.to_console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let file = match &config.file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(!config.overwrite)
                .truncate(config.overwrite)
                .open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| crate::Error::generic(format!("Failed to install logger: {e}")))?;

    tracing::info!("Logger started");
    Ok(())
}
