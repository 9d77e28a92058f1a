//! Tempest pipeline daemon
//!
//! This binary coordinates:
//! - Historical fetch, day bucketing, and window building
//! - Monthly extremes summary
//! - The live update client pushing throttled samples to a consumer

mod reports;

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tempest_config::AppConfig;
use tempest_fetch::HistoryClient;
use tempest_live::LiveConfig;

/// Day offsets covered by the startup chart window.
const CHART_DAYS: u32 = 7;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tempest pipeline daemon");

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let client = HistoryClient::with_timeout(
        &config.rest_base,
        &config.token,
        Duration::from_secs(config.fetch_timeout_secs),
    );

    // Aggregation passes are independent of the live feed; a failure here
    // is the caller's to retry, not ours.
    if let Err(e) = reports::historical_window(&client, &config.device_id, CHART_DAYS).await {
        warn!(error = %e, "historical window unavailable");
    }
    if let Err(e) = reports::monthly_summary(&client, &config.device_id).await {
        warn!(error = %e, "monthly summary unavailable");
    }

    // Station passes only run when a station id is configured.
    if let Some(station_id) = config.station_id.as_deref() {
        if let Err(e) = reports::station_window(&client, station_id).await {
            warn!(error = %e, "station window unavailable");
        }
        if let Err(e) = reports::station_forecast(&client, station_id).await {
            warn!(error = %e, "station forecast unavailable");
        }
    }

    // Live update client, delivering throttled samples over a channel.
    let live_config = LiveConfig {
        ws_url: config.ws_url.clone(),
        token: config.token.clone(),
        device_id: config.device_id.clone(),
        throttle: Duration::from_millis(config.live_throttle_ms),
        reconnect_delay: Duration::from_secs(config.live_reconnect_secs),
    };

    let (sample_tx, mut sample_rx) = mpsc::channel(16);
    let live = tempest_live::spawn(live_config, sample_tx).context("Failed to start live client")?;

    let consumer = tokio::spawn(async move {
        while let Some(sample) = sample_rx.recv().await {
            info!(
                timestamp = sample.timestamp,
                temperature = sample.temperature,
                humidity = sample.humidity,
                rain = sample.rain,
                "live observation"
            );
        }
    });

    info!("Daemon running - press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutdown signal received");
    live.teardown().await;
    consumer.abort();

    info!("Tempest pipeline daemon stopped");
    Ok(())
}
