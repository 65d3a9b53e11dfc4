//! Tracing setup.

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Replace the level if an override is given (e.g. from the CLI).
    pub fn with_level_override(mut self, level: Option<&str>) -> Self {
        if let Some(level) = level {
            self.level = level.to_string();
        }
        self
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. JSON output
/// flattens event fields into the top-level object.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), BridgeError> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.level)?,
    };

    let output = match config.format {
        LogFormat::Text => fmt::layer().with_target(false).boxed(),
        LogFormat::Json => fmt::layer().json().flatten_event(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| BridgeError::Config(format!("Tracing already initialized: {}", e)))
}

/// Parse a configured level or directive list (`info`, `warn,zenoh=error`).
pub fn level_filter(level: &str) -> Result<tracing_subscriber::EnvFilter, BridgeError> {
    tracing_subscriber::EnvFilter::try_new(level)
        .map_err(|e| BridgeError::Config(format!("Invalid log level '{}': {}", level, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_override() {
        let config = LoggingConfig::default().with_level_override(Some("trace"));
        assert_eq!(config.level, "trace");

        let config = LoggingConfig::default().with_level_override(None);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_parse_format() {
        let config: LoggingConfig = json5::from_str(r#"{ format: "json" }"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }

    #[test]
    fn test_level_filter() {
        assert!(level_filter("info").is_ok());
        assert!(level_filter("warn,zenoh_bridge_emfit=debug").is_ok());
        assert!(matches!(
            level_filter("zenoh=loud"),
            Err(BridgeError::Config(_))
        ));
    }
}
