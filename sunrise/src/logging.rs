//! Logging setup.
//!
//! Logs go to a daily-rolling `sunrise.log` in the log directory and, unless
//! disabled, to stderr. The filter comes from `SUNRISE_LOG`, then `RUST_LOG`,
//! then the configured level.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub use tracing_appender::non_blocking::WorkerGuard;

/// Log file name prefix inside the log directory.
pub const LOG_FILE_NAME: &str = "sunrise.log";

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "SUNRISE_LOG";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create log directory {path}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
}

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub level: String,
    pub stderr: bool,
}

impl LoggingConfig {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            level: "info".to_string(),
            stderr: true,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_stderr(mut self, stderr: bool) -> Self {
        self.stderr = stderr;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new(&self.level))
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the program.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard, LoggingError> {
    std::fs::create_dir_all(&config.directory).map_err(|e| LoggingError::CreateDirFailed {
        path: config.directory.clone(),
        source: e,
    })?;

    let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_timer(LocalTime::rfc_3339())
        .with_ansi(false)
        .with_writer(writer);

    let stderr_layer = config.stderr.then(|| {
        fmt::layer()
            .with_timer(LocalTime::rfc_3339())
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(config.filter())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_builder() {
        let config = LoggingConfig::new("/var/log/sunrise")
            .with_level("debug")
            .with_stderr(false);

        assert_eq!(config.directory, PathBuf::from("/var/log/sunrise"));
        assert_eq!(config.level, "debug");
        assert!(!config.stderr);
    }

    #[test]
    fn test_init_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("logs");
        let config = LoggingConfig::new(&dir).with_stderr(false);

        // Another test may already own the global subscriber.
        match init(&config) {
            Ok(guard) => drop(guard),
            Err(LoggingError::AlreadyInitialized) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
        assert!(dir.is_dir());
    }
}
