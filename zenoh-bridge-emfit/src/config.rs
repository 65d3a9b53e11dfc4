//! Configuration for the Emfit bridge.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::descriptor::MetricKind;
use crate::fetcher::{DEFAULT_MIN_REFRESH_INTERVAL, DEFAULT_TIMEOUT, status_url};
use crate::logging::LoggingConfig;
use crate::telemetry::Format;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmfitBridgeConfig {
    /// Zenoh connection settings.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Device settings.
    pub emfit: EmfitConfig,

    /// Telemetry payload encoding.
    #[serde(default)]
    pub serialization: Format,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Zenoh connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// Zenoh mode: "client", "peer", or "router".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Endpoints to connect to.
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on.
    #[serde(default)]
    pub listen: Vec<String>,
}

fn default_mode() -> String {
    "peer".to_string()
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: Vec::new(),
            listen: Vec::new(),
        }
    }
}

/// Emfit QS device configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmfitConfig {
    /// Device address, optionally with a port (e.g., "192.168.1.40").
    pub host: String,

    /// Metrics to expose: "heart_rate", "respiratory_rate",
    /// "activity_level", "seconds_in_bed".
    pub resources: Vec<String>,

    /// Key expression prefix (default: "zensight/emfit").
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// How often the metrics are polled and published, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Minimum time between two requests to the device, in seconds.
    #[serde(default = "default_min_refresh_interval")]
    pub min_refresh_interval_secs: u64,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_key_prefix() -> String {
    "zensight/emfit".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

fn default_min_refresh_interval() -> u64 {
    DEFAULT_MIN_REFRESH_INTERVAL.as_secs()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl EmfitConfig {
    /// Minimal configuration with defaults for everything but the device.
    pub fn new(host: impl Into<String>, resources: &[MetricKind]) -> Self {
        Self {
            host: host.into(),
            resources: resources.iter().map(|k| k.as_str().to_string()).collect(),
            key_prefix: default_key_prefix(),
            poll_interval_secs: default_poll_interval(),
            min_refresh_interval_secs: default_min_refresh_interval(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn min_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.min_refresh_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the configured resources, rejecting unknown names.
    pub fn metric_kinds(&self) -> Result<Vec<MetricKind>, ConfigError> {
        self.resources
            .iter()
            .map(|r| {
                r.parse::<MetricKind>()
                    .map_err(|e| ConfigError::Validation(e.to_string()))
            })
            .collect()
    }
}

impl EmfitBridgeConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: EmfitBridgeConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.zenoh.mode.as_str() {
            "client" | "peer" | "router" => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Invalid Zenoh mode '{}' (use client, peer, or router)",
                    other
                )));
            }
        }

        let emfit = &self.emfit;

        status_url(&emfit.host).map_err(|e| ConfigError::Validation(e.to_string()))?;

        if emfit.resources.is_empty() {
            return Err(ConfigError::Validation(
                "At least one resource must be configured".to_string(),
            ));
        }
        emfit.metric_kinds()?;

        if emfit.key_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "key_prefix cannot be empty".to_string(),
            ));
        }

        for (name, value) in [
            ("poll_interval_secs", emfit.poll_interval_secs),
            ("min_refresh_interval_secs", emfit.min_refresh_interval_secs),
            ("timeout_secs", emfit.timeout_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        Ok(())
    }
}
