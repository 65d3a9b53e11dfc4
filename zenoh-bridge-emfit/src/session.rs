//! Zenoh session setup.

use zenoh::Session;

use crate::config::ZenohConfig;
use crate::error::{BridgeError, Result};

/// Translate the bridge's Zenoh settings into a native Zenoh config.
pub fn zenoh_config(config: &ZenohConfig) -> Result<zenoh::Config> {
    let mut zenoh_config = zenoh::Config::default();

    let set = |cfg: &mut zenoh::Config, key: &str, value: String| {
        cfg.insert_json5(key, &value)
            .map_err(|e| BridgeError::Config(format!("Failed to set {}: {}", key, e)))
    };

    match config.mode.as_str() {
        "client" | "peer" | "router" => {
            set(&mut zenoh_config, "mode", format!("\"{}\"", config.mode))?
        }
        other => {
            return Err(BridgeError::Config(format!(
                "Invalid Zenoh mode: '{}'. Expected 'client', 'peer', or 'router'",
                other
            )));
        }
    }

    if !config.connect.is_empty() {
        let endpoints = serde_json::to_string(&config.connect)?;
        set(&mut zenoh_config, "connect/endpoints", endpoints)?;
    }

    if !config.listen.is_empty() {
        let endpoints = serde_json::to_string(&config.listen)?;
        set(&mut zenoh_config, "listen/endpoints", endpoints)?;
    }

    Ok(zenoh_config)
}

/// Open a Zenoh session.
pub async fn connect(config: &ZenohConfig) -> Result<Session> {
    let zenoh_config = zenoh_config(config)?;

    tracing::info!(
        mode = %config.mode,
        connect = ?config.connect,
        listen = ?config.listen,
        "Connecting to Zenoh"
    );

    let session = zenoh::open(zenoh_config).await?;
    tracing::info!(zid = %session.zid(), "Connected to Zenoh");

    Ok(session)
}
