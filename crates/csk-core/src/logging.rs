//! # Structured Logging
//!
//! Log setup for simulation runs via the `tracing` ecosystem:
//!
//! - JSON, pretty or compact console output on stderr
//! - Level filtering, overridable through `RUST_LOG`
//! - An optional plain-text copy of every event in a log file
//!
//! ## Example
//!
//! ```rust,ignore
//! use csk_core::logging::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig {
//!     level: LogLevel::Debug,
//!     ..Default::default()
//! };
//!
//! init_logging(&config)?;
//!
//! tracing::info!(trials = 10_000, "Simulation started");
//! ```

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    Info,
    /// Warning level
    Warn,
    /// Error level (least verbose)
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    /// Level for a `-v` count: 0 is warnings only, 1 info, 2 and up debug.
    pub fn from_verbosity(verbosity: u8) -> Self {
        match verbosity {
            0 => LogLevel::Warn,
            1 => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format (machine-readable)
    Json,
    /// Pretty format (human-readable, colored)
    Pretty,
    /// Compact format (minimal, one line per event)
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Compact
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level
    pub level: LogLevel,
    /// Console format
    pub format: LogFormat,
    /// Log file path (None for the console only)
    pub file: Option<PathBuf>,
    /// Include source location (file:line)
    pub source_location: bool,
    /// Include thread IDs
    pub thread_ids: bool,
    /// Module filter (e.g., "csk_core=debug"); takes precedence over `RUST_LOG`
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            file: None,
            source_location: false,
            thread_ids: false,
            filter: None,
        }
    }
}

impl LogConfig {
    fn env_filter(&self) -> EnvFilter {
        if let Some(ref custom) = self.filter {
            EnvFilter::try_new(custom).unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.to_string()))
        }
    }
}

/// Initialize the global logging subscriber.
///
/// Call once at startup; later calls leave the first subscriber in place.
/// Fails only when the log file cannot be created.
pub fn init_logging(config: &LogConfig) -> std::io::Result<()> {
    let console = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .with_thread_ids(config.thread_ids)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .with_thread_ids(config.thread_ids)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_file(config.source_location)
            .with_line_number(config.source_location)
            .with_thread_ids(config.thread_ids)
            .boxed(),
    };

    let file = match config.file {
        Some(ref path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_thread_ids(config.thread_ids),
            )
        }
        None => None,
    };

    let result = tracing_subscriber::registry()
        .with(config.env_filter())
        .with(console)
        .with(file)
        .try_init();

    // Ignore error if subscriber was already set
    let _ = result;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_display() {
        assert_eq!(format!("{}", LogLevel::Debug), "debug");
        assert_eq!(format!("{}", LogLevel::Warn), "warn");
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Warn);
        assert_eq!(LogLevel::from_verbosity(1), LogLevel::Info);
        assert_eq!(LogLevel::from_verbosity(2), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(7), LogLevel::Debug);
    }

    #[test]
    fn test_config_yaml() {
        let config: LogConfig = serde_yaml::from_str("level: debug\nformat: json").unwrap();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_init_with_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let config = LogConfig {
            file: Some(path.clone()),
            ..Default::default()
        };
        init_logging(&config).unwrap();
        assert!(path.exists());
    }
}
