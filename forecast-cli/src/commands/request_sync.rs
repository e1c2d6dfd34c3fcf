//! Send a sync request from the companion and watch the primary react.

use anyhow::{bail, Context, Result};
use forecast_client::{Publisher, TransportConnection, UpdateTrigger};
use tokio::sync::mpsc;

use super::{connect_and_wait, loopback};
use crate::config::Config;

/// Run the request-sync command.
pub async fn run(config: &Config) -> Result<()> {
    let (primary, companion) = loopback(config);
    let timeout = config.sync.connect_timeout();

    let (tx, mut fired) = mpsc::unbounded_channel();
    let primary_connection = TransportConnection::new(primary);
    let trigger = UpdateTrigger::new(&config.sync.trigger_path, move || {
        let _ = tx.send(());
    })
    .listen(&primary_connection);
    connect_and_wait(&primary_connection, timeout)
        .await
        .context("Primary could not connect")?;

    let requester = Publisher::new(TransportConnection::new(companion), config.sync.clone());
    let receipt = requester
        .request_sync()
        .outcome()
        .await
        .context("Sync request failed")?;
    println!(
        "Sync requested at {} (timestamp {})",
        receipt.path, receipt.timestamp_millis
    );

    match tokio::time::timeout(timeout, fired.recv()).await {
        Ok(Some(())) => println!("Primary trigger fired ({} total)", trigger.fired()),
        _ => bail!("Primary trigger did not fire"),
    }

    requester.connection().disconnect().await?;
    primary_connection.disconnect().await?;
    Ok(())
}
