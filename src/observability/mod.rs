//! Structured logging setup.
//!
//! Initialization is process-global and idempotent-hostile on purpose: a
//! second call is an error rather than a silent reconfiguration.

use crate::{Error, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// Parses a format name, defaulting to pretty for unknown values.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr when absent.
    pub file: Option<PathBuf>,
    /// Filter directives, `RUST_LOG` style. `None` uses the environment
    /// with an `info` default.
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Builds a config honoring a verbose override.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self {
            format: std::env::var("DOCDEX_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
            file: std::env::var("DOCDEX_LOG_FILE").ok().map(PathBuf::from),
            filter: verbose.then(|| "debug".to_string()),
        }
    }
}

/// Initializes the process-wide tracing subscriber.
///
/// # Errors
///
/// Returns an error if logging has already been initialized or the log
/// file cannot be opened.
pub fn init(config: &LoggingConfig) -> Result<()> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Err(Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: "logging already initialized".to_string(),
        });
    }

    let filter = match &config.filter {
        Some(directives) => EnvFilter::try_new(directives).map_err(|e| Error::OperationFailed {
            operation: "observability_init".to_string(),
            cause: e.to_string(),
        })?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    match (&config.file, config.format) {
        (Some(path), LogFormat::Json) => {
            let writer = open_log_file(path)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        (Some(path), LogFormat::Pretty) => {
            let writer = open_log_file(path)?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(writer)
                        .with_ansi(false)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        (None, LogFormat::Json) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
        (None, LogFormat::Pretty) => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true),
                )
                .with(filter)
                .try_init()
                .map_err(init_error)?;
        }
    }

    let _ = OBSERVABILITY_INIT.set(());
    Ok(())
}

fn open_log_file(path: &Path) -> Result<Mutex<std::fs::File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::Io {
            operation: "open_log",
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(Mutex::new(file))
}

fn init_error(e: impl std::fmt::Display) -> Error {
    Error::OperationFailed {
        operation: "observability_init".to_string(),
        cause: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("garbage"), LogFormat::Pretty);
    }

    #[test]
    fn test_default_config_uses_stderr() {
        let config = LoggingConfig::default();
        assert!(config.file.is_none());
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_second_init_is_an_error() {
        // The first call may or may not be the process-wide winner
        // depending on test ordering; the second call must always fail.
        let _ = init(&LoggingConfig::default());
        let result = init(&LoggingConfig::default());
        assert!(matches!(result, Err(Error::OperationFailed { .. })));
    }
}
