//! Error types for the Emfit bridge.

use thiserror::Error;

/// Errors raised while parsing the device status page.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: missing '=' delimiter in {content:?}")]
    MissingDelimiter { line: usize, content: String },

    #[error("line {line}: empty field name")]
    EmptyKey { line: usize },
}

/// Errors raised by a single fetch of the status page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Malformed status page: {0}")]
    Parse(#[from] ParseError),
}

/// Reasons a metric poll left its value unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("last status refresh failed, record is stale")]
    StaleRecord,

    #[error("field '{0}' missing from status record")]
    MissingField(&'static str),
}

/// Errors raised while setting up the device and its metric views.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid device host '{host}': {reason}")]
    InvalidHost { host: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Unknown resource '{0}'")]
    UnknownResource(String),

    #[error("Device at {0} did not return a valid status page")]
    Unreachable(String),

    #[error("Device did not report a serial number (field '{0}')")]
    MissingSerial(&'static str),
}

/// Errors raised by the Zenoh side of the bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Zenoh error: {0}")]
    Zenoh(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Failed to publish to {key}: {message}")]
    Publish { key: String, message: String },
}

impl From<zenoh::Error> for BridgeError {
    fn from(err: zenoh::Error) -> Self {
        Self::Zenoh(err.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<ciborium::ser::Error<std::io::Error>> for BridgeError {
    fn from(err: ciborium::ser::Error<std::io::Error>) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias using [`BridgeError`].
pub type Result<T> = std::result::Result<T, BridgeError>;
