//! Structured logging system for Pulse.
//!
//! Provides configurable logging with JSON and pretty-print formats and
//! `RUST_LOG`-style level overrides.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for log records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable output for development.
    #[default]
    Pretty,
    /// Newline-delimited JSON for log ingestion.
    Json,
}

/// Configuration for the logging system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default log level directive (e.g., "info", "debug", "pulse_client=trace").
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include the emitting module path in output.
    #[serde(default = "default_include_target")]
    pub include_target: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_include_target() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            include_target: default_include_target(),
        }
    }
}

/// Errors raised while initializing logging.
#[derive(Error, Debug)]
pub enum LoggingError {
    /// A global subscriber was already installed.
    #[error("[Telemetry] logging already initialized: {reason}")]
    AlreadyInitialized {
        /// Underlying error message.
        reason: String,
    },
}

/// Initialize the logging system with the given configuration.
///
/// The `RUST_LOG` environment variable, when set, overrides the configured
/// level.
///
/// # Example
///
/// ```no_run
/// use pulse_telemetry::{init_logging, LogConfig};
///
/// let config = LogConfig::default();
/// init_logging(&config).expect("failed to initialize logging");
/// ```
pub fn init_logging(config: &LogConfig) -> Result<(), LoggingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match config.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_target(config.include_target),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(config.include_target))
            .try_init(),
    };

    result.map_err(|e| LoggingError::AlreadyInitialized {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.include_target);
    }

    #[test]
    fn test_format_serde() {
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, r#""json""#);
        let parsed: LogFormat = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, LogFormat::Json);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: LogConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_double_init_reports_error() {
        let config = LogConfig::default();
        // First call may or may not win depending on test ordering; the
        // second is guaranteed to find a subscriber installed.
        let _ = init_logging(&config);
        let second = init_logging(&config);
        assert!(second.is_err());
    }
}
