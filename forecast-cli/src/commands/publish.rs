//! Publish a forecast from the primary and report what the companion got.

use anyhow::{Context, Result};
use forecast_client::{ChangeListener, ForecastConsumer, Publisher, TransportConnection};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::{connect_and_wait, loopback};
use crate::config::Config;

/// Run the publish command.
pub async fn run(
    config: &Config,
    weather_id: i32,
    high_temp: &str,
    low_temp: &str,
    icon: Option<Vec<u8>>,
) -> Result<()> {
    let (primary, companion) = loopback(config);
    let timeout = config.sync.connect_timeout();

    let (tx, mut received) = mpsc::unbounded_channel();
    let consumer: Arc<dyn ForecastConsumer> = Arc::new(move |id: i32, high: &str, low: &str| {
        let _ = tx.send((id, high.to_string(), low.to_string()));
    });
    let listener = ChangeListener::new(TransportConnection::new(companion), &config.sync, consumer);
    connect_and_wait(listener.connection(), timeout)
        .await
        .context("Companion could not connect")?;

    let publisher = Publisher::new(TransportConnection::new(primary), config.sync.clone());
    let receipt = publisher
        .publish(weather_id, high_temp, low_temp, icon)
        .outcome()
        .await
        .context("Publish failed")?;
    println!(
        "Published forecast to {} (timestamp {})",
        receipt.path, receipt.timestamp_millis
    );

    let (id, high, low) = tokio::time::timeout(timeout, received.recv())
        .await
        .ok()
        .flatten()
        .context("Companion received nothing")?;
    println!("Companion received: weather {} high {} low {}", id, high, low);
    if let Some(icon) = listener.forecast().and_then(|f| f.icon) {
        println!("  icon: {} bytes", icon.len());
    }

    publisher.connection().disconnect().await?;
    listener.stop().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_over_loopback() {
        let result = run(&Config::default(), 800, "75°", "52°", Some(vec![1, 2, 3])).await;
        assert!(result.is_ok(), "got: {:?}", result);
    }

    #[tokio::test]
    async fn publish_rejects_icon_over_configured_limit() {
        let mut config = Config::default();
        config.transport.max_asset_bytes = 2;

        let err = run(&config, 800, "75°", "52°", Some(vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Publish failed"), "got: {}", err);
    }
}
