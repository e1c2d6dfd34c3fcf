//! Client errors.

use forecast_core::ConnectionFailure;
use thiserror::Error;

use crate::transport::TransportError;

/// Client errors.
///
/// Every error ends the single attempt that produced it; nothing in this
/// crate retries.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Operation attempted while the connection is not `Connected`.
    #[error("not connected")]
    NotConnected,

    /// The connection attempt failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(ConnectionFailure),

    /// The transport refused or could not deliver an item.
    #[error("publish failed: {0}")]
    PublishFailed(#[source] TransportError),

    /// Transport error outside a publish (e.g. while closing).
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
}

impl ClientError {
    /// Classify a transport error raised while putting an item.
    pub(crate) fn from_put(err: TransportError) -> Self {
        match err {
            TransportError::NotConnected | TransportError::ConnectionClosed => Self::NotConnected,
            other => Self::PublishFailed(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::FailureCode;

    #[test]
    fn put_not_connected_is_not_a_publish_failure() {
        assert!(matches!(
            ClientError::from_put(TransportError::NotConnected),
            ClientError::NotConnected
        ));
    }

    #[test]
    fn put_on_closed_session_is_not_connected() {
        assert!(matches!(
            ClientError::from_put(TransportError::ConnectionClosed),
            ClientError::NotConnected
        ));
    }

    #[test]
    fn oversized_asset_is_a_publish_failure() {
        let err = ClientError::from_put(TransportError::AssetTooLarge {
            size: 10,
            limit: 5,
        });
        assert!(matches!(
            err,
            ClientError::PublishFailed(TransportError::AssetTooLarge { .. })
        ));
    }

    #[test]
    fn connection_failed_display() {
        let err = ClientError::ConnectionFailed(ConnectionFailure::new(
            FailureCode::Unreachable,
            "no companion",
        ));
        assert_eq!(err.to_string(), "connection failed: unreachable: no companion");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClientError>();
    }
}
