//! Transport abstraction for forecast sync.
//!
//! This module provides a pluggable transport layer that abstracts the
//! underlying device-to-device pub/sub channel.
//!
//! # Design
//!
//! The transport trait is async and connection-oriented:
//! - `connect()` establishes a connection and hands the transport the
//!   session's event channel
//! - `put_data_item()` stores an item for delivery to the peer
//! - `close()` releases the connection
//!
//! Everything the transport observes after connecting (interruptions,
//! recovery, loss, incoming record changes) is pushed into the event
//! channel as a [`TransportEvent`]. The connection drains that channel on a
//! single task, so callbacks for one session never run concurrently.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! let (events, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! transport.connect(events).await?;
//! transport.put_data_item(item).await?;
//! ```

mod mock;

pub use mock::{MockTransport, DEFAULT_MAX_ASSET_SIZE};

use async_trait::async_trait;
use forecast_core::{ConnectionFailure, FailureCode, SuspendCause};
use forecast_types::{DataEvent, DataItem};
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(ConnectionFailure),

    /// Not connected.
    #[error("not connected")]
    NotConnected,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// The peer could not take the item.
    #[error("put failed: {0}")]
    PutFailed(String),

    /// An asset exceeds the transport's size ceiling.
    #[error("asset of {size} bytes exceeds transport limit of {limit} bytes")]
    AssetTooLarge {
        /// Size of the offending asset.
        size: usize,
        /// Transport ceiling.
        limit: usize,
    },

    /// Operation timeout.
    #[error("operation timeout")]
    Timeout,
}

impl TransportError {
    /// Reduce a connect-time error to the failure reported to observers.
    pub fn into_failure(self) -> ConnectionFailure {
        match self {
            Self::ConnectionFailed(failure) => failure,
            Self::Timeout => ConnectionFailure::timeout(),
            other => ConnectionFailure::new(FailureCode::Internal, other.to_string()),
        }
    }
}

/// Something the transport observed after connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection was interrupted and may recover.
    Suspended(SuspendCause),
    /// An interrupted connection came back.
    Resumed,
    /// The transport gave up on the connection.
    Lost(ConnectionFailure),
    /// Items changed on the peer, in arrival order.
    DataChanged(Vec<DataEvent>),
}

/// Sending half of a session's event channel.
pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

/// Transport trait for storing and receiving path-addressed data items.
///
/// Implementations handle the underlying device link (wearable data layer,
/// loopback mock, etc).
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Connect and start reporting events into `events`.
    ///
    /// A transport keeps at most one event channel; a new connect replaces
    /// the previous one.
    async fn connect(&self, events: EventSender) -> Result<(), TransportError>;

    /// Store an item for delivery to the peer.
    ///
    /// Returns once the transport has accepted the item. A pending item at
    /// the same path may be superseded.
    async fn put_data_item(&self, item: DataItem) -> Result<(), TransportError>;

    /// Largest asset, in bytes, the transport accepts.
    fn max_asset_size(&self) -> usize;

    /// Check if currently connected.
    fn is_connected(&self) -> bool;

    /// Close the connection and drop the event channel.
    async fn close(&self) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failed_keeps_reason_code() {
        let failure = ConnectionFailure::new(FailureCode::ApiUnavailable, "no wearable API");
        let err = TransportError::ConnectionFailed(failure.clone());
        assert_eq!(err.into_failure(), failure);
    }

    #[test]
    fn timeout_maps_to_timeout_code() {
        assert_eq!(
            TransportError::Timeout.into_failure().code,
            FailureCode::Timeout
        );
    }

    #[test]
    fn other_errors_map_to_internal() {
        let failure = TransportError::ConnectionClosed.into_failure();
        assert_eq!(failure.code, FailureCode::Internal);
        assert_eq!(failure.message, "connection closed");
    }

    #[test]
    fn asset_too_large_display() {
        let err = TransportError::AssetTooLarge {
            size: 200_000,
            limit: 102_400,
        };
        assert_eq!(
            err.to_string(),
            "asset of 200000 bytes exceeds transport limit of 102400 bytes"
        );
    }
}
