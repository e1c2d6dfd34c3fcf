//! Publisher - the primary device's side of forecast sync.
//!
//! `publish()` never blocks the caller. It builds and validates the record,
//! starts connecting if needed, and returns a [`PublishHandle`]. A background
//! task waits for the connection (bounded by the configured timeout) and puts
//! the item exactly once. Failures are logged and reported through the
//! handle; there is no retry queue.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use forecast_core::{ConnectionFailure, SuspendCause};
use forecast_types::{codec, Asset, DataItem, ForecastRecord};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::connection::{ConnectionObserver, Subscriptions, TransportConnection};
use crate::error::ClientError;
use crate::transport::{Transport, TransportError};

/// Confirmation that the transport accepted an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Path the item was put at.
    pub path: String,
    /// Timestamp carried by the item.
    pub timestamp_millis: i64,
}

/// Handle to one in-flight publish.
///
/// Dropping the handle does not cancel the publish.
#[derive(Debug)]
pub struct PublishHandle {
    timestamp_millis: i64,
    outcome: oneshot::Receiver<Result<PublishReceipt, ClientError>>,
}

impl PublishHandle {
    fn resolved(timestamp_millis: i64, result: Result<PublishReceipt, ClientError>) -> Self {
        let (tx, outcome) = oneshot::channel();
        let _ = tx.send(result);
        Self {
            timestamp_millis,
            outcome,
        }
    }

    /// Timestamp of the published record.
    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    /// Wait for the single delivery attempt to finish.
    pub async fn outcome(self) -> Result<PublishReceipt, ClientError> {
        self.outcome
            .await
            .unwrap_or(Err(ClientError::NotConnected))
    }
}

/// Publishes forecasts to the companion device.
pub struct Publisher<T: Transport> {
    connection: TransportConnection<T>,
    config: SyncConfig,
    last_timestamp: Mutex<i64>,
}

impl<T: Transport> Publisher<T> {
    /// Create a publisher over `connection`.
    ///
    /// Does not connect; the first publish does.
    pub fn new(connection: TransportConnection<T>, config: SyncConfig) -> Self {
        connection.add_observer(Arc::new(PublishLog));
        Self {
            connection,
            config,
            last_timestamp: Mutex::new(0),
        }
    }

    /// Publish the latest forecast.
    ///
    /// Returns immediately. The record is stamped with the current time
    /// (never earlier than a previous publish from this publisher). An icon
    /// larger than the transport ceiling fails the publish without touching
    /// the transport.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn publish(
        &self,
        weather_id: i32,
        high_temp: &str,
        low_temp: &str,
        icon: Option<Vec<u8>>,
    ) -> PublishHandle {
        let mut record =
            ForecastRecord::new(self.next_timestamp(), weather_id, high_temp, low_temp);
        if let Some(bytes) = icon {
            record = record.with_icon(Asset::from_bytes(bytes));
        }

        let limit = self.connection.max_asset_size();
        if let Some(size) = record.icon.as_ref().map(Asset::len).filter(|&s| s > limit) {
            warn!(size, limit, "icon exceeds transport asset limit, not publishing");
            return PublishHandle::resolved(
                record.timestamp_millis,
                Err(ClientError::PublishFailed(TransportError::AssetTooLarge {
                    size,
                    limit,
                })),
            );
        }

        debug!(
            weather_id,
            timestamp_millis = record.timestamp_millis,
            has_icon = record.icon.is_some(),
            "publishing forecast"
        );
        let item = DataItem::new(self.config.forecast_path.as_str(), codec::encode(&record));
        self.send(item, record.timestamp_millis)
    }

    /// Ask the other side to publish a fresh forecast now.
    ///
    /// Puts a record holding only a timestamp at the trigger path.
    pub fn request_sync(&self) -> PublishHandle {
        let timestamp_millis = self.next_timestamp();
        debug!(timestamp_millis, "requesting sync");
        let item = DataItem::new(
            self.config.trigger_path.as_str(),
            codec::sync_request(timestamp_millis),
        );
        self.send(item, timestamp_millis)
    }

    /// The connection this publisher writes through.
    pub fn connection(&self) -> &TransportConnection<T> {
        &self.connection
    }

    /// The active configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn send(&self, item: DataItem, timestamp_millis: i64) -> PublishHandle {
        if !self.connection.is_connected() {
            self.connection.connect();
        }

        let (tx, outcome) = oneshot::channel();
        let connection = self.connection.clone();
        let timeout = self.config.connect_timeout();
        tokio::spawn(async move {
            let path = item.path.clone();
            let result = deliver(&connection, item, timeout).await;
            match &result {
                Ok(()) => info!(%path, timestamp_millis, "data item delivered"),
                Err(e) => warn!(%path, timestamp_millis, error = %e, "failed to deliver data item"),
            }
            let _ = tx.send(result.map(|()| PublishReceipt {
                path,
                timestamp_millis,
            }));
        });

        PublishHandle {
            timestamp_millis,
            outcome,
        }
    }

    fn next_timestamp(&self) -> i64 {
        let mut last = self
            .last_timestamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *last = codec::now_millis().max(*last);
        *last
    }
}

async fn deliver<T: Transport>(
    connection: &TransportConnection<T>,
    item: DataItem,
    timeout: Duration,
) -> Result<(), ClientError> {
    connection.wait_connected(timeout).await?;
    connection.put_data_item(item).await
}

struct PublishLog;

impl ConnectionObserver for PublishLog {
    fn on_connected(&self, _subscriptions: &Subscriptions) {
        debug!("publisher ready");
    }

    fn on_connection_suspended(&self, cause: SuspendCause) {
        debug!(%cause, "publisher paused");
    }

    fn on_connection_failed(&self, failure: &ConnectionFailure) {
        warn!(%failure, "publisher cannot reach companion; pending publishes will fail");
    }
}
