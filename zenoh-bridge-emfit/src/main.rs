//! Zenoh bridge for Emfit QS sleep monitors.
//!
//! This bridge polls the device's local status page and publishes heart
//! rate, respiratory rate, activity level and time in bed to Zenoh.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use zenoh_bridge_emfit::config::EmfitBridgeConfig;
use zenoh_bridge_emfit::logging::init_tracing;
use zenoh_bridge_emfit::poller::{EmfitPoller, status_key};
use zenoh_bridge_emfit::{MetricView, Sensor, session, setup_platform};

/// Zenoh bridge for Emfit QS sleep monitors.
#[derive(Parser, Debug)]
#[command(name = "zenoh-bridge-emfit")]
#[command(about = "Polls an Emfit QS device and publishes to Zenoh")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "emfit.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = EmfitBridgeConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    let log_config = config
        .logging
        .clone()
        .with_level_override(args.log_level.as_deref());
    init_tracing(&log_config).context("Failed to init tracing")?;

    info!("Starting zenoh-bridge-emfit");
    info!("Loaded configuration from {:?}", args.config);

    let emfit = &config.emfit;

    let mut views: Vec<MetricView> = Vec::new();
    if !setup_platform(emfit, |registered| views = registered).await {
        anyhow::bail!("Failed to set up Emfit QS device at {}", emfit.host);
    }

    let serial = views
        .first()
        .map(|v| v.serial().to_string())
        .unwrap_or_default();

    info!("Connecting to Zenoh...");
    let session = Arc::new(
        session::connect(&config.zenoh)
            .await
            .context("Failed to connect to Zenoh")?,
    );

    let status_key = status_key(&emfit.key_prefix);
    let status = serde_json::json!({
        "bridge": "emfit",
        "version": env!("CARGO_PKG_VERSION"),
        "host": emfit.host,
        "serial": serial,
        "metrics": views.iter().map(|v| v.kind().as_str()).collect::<Vec<_>>(),
        "status": "running"
    });

    let poller = EmfitPoller::new(
        views,
        emfit.key_prefix.clone(),
        emfit.poll_interval(),
        session.clone(),
        config.serialization,
    );
    let task = tokio::spawn(poller.run());

    if let Err(e) = session.put(&status_key, status.to_string()).await {
        error!("Failed to publish bridge status: {}", e);
    }

    info!(
        "Emfit bridge running for device {} ({})",
        serial, emfit.host
    );

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    task.abort();

    let status = serde_json::json!({
        "bridge": "emfit",
        "status": "offline"
    });
    let _ = session.put(&status_key, status.to_string()).await;

    session
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to close Zenoh session: {}", e))?;
    info!("Emfit bridge stopped");

    Ok(())
}
