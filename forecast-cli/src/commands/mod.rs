//! CLI command implementations.

pub mod publish;
pub mod record;
pub mod request_sync;

use anyhow::{bail, Result};
use forecast_client::{
    ConnectionObserver, MockTransport, Subscriptions, Transport, TransportConnection,
};
use forecast_core::ConnectionFailure;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;

use crate::config::Config;

/// A linked `(primary, companion)` transport pair honouring the configured
/// asset ceiling.
pub(crate) fn loopback(config: &Config) -> (MockTransport, MockTransport) {
    let (primary, companion) = MockTransport::pair();
    let limit = config.transport.max_asset_bytes;
    (
        primary.with_max_asset_size(limit),
        companion.with_max_asset_size(limit),
    )
}

/// Connect and proceed once the first `on_connected` (or failure) arrives.
pub(crate) async fn connect_and_wait<T: Transport>(
    connection: &TransportConnection<T>,
    timeout: Duration,
) -> Result<()> {
    let (tx, rx) = oneshot::channel();
    connection.add_observer(Arc::new(FirstOutcome(Mutex::new(Some(tx)))));
    connection.connect();

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(failure))) => bail!("Connection failed: {}", failure),
        Ok(Err(_)) | Err(_) => bail!("Timed out waiting for connection"),
    }
}

struct FirstOutcome(Mutex<Option<oneshot::Sender<Result<(), ConnectionFailure>>>>);

impl FirstOutcome {
    fn resolve(&self, outcome: Result<(), ConnectionFailure>) {
        let sender = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = sender {
            let _ = tx.send(outcome);
        }
    }
}

impl ConnectionObserver for FirstOutcome {
    fn on_connected(&self, _subscriptions: &Subscriptions) {
        self.resolve(Ok(()));
    }

    fn on_connection_failed(&self, failure: &ConnectionFailure) {
        self.resolve(Err(failure.clone()));
    }
}
