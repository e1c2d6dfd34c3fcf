//! Mock transport for testing.
//!
//! Captures put items, injects failures and transport events, and can be
//! linked to a second mock so that items put on one side arrive on the other
//! as record-changed batches.

use super::{EventSender, Transport, TransportError, TransportEvent};
use async_trait::async_trait;
use forecast_core::{ConnectionFailure, FailureCode, SuspendCause};
use forecast_types::{DataEvent, DataItem};
use std::sync::{Arc, Mutex, Weak};

/// Asset ceiling used when none is configured (100 KiB).
pub const DEFAULT_MAX_ASSET_SIZE: usize = 100 * 1024;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the connection
/// under test owns another.
#[derive(Debug, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Debug)]
struct MockTransportInner {
    connected: bool,
    /// Bumped by close(); a connect that straddles a close is aborted.
    generation: u64,
    events: Option<EventSender>,
    put_items: Vec<DataItem>,
    connect_attempts: u32,
    fail_next_connect: Option<ConnectionFailure>,
    fail_next_put: Option<String>,
    max_asset_size: usize,
    peer: Option<Weak<Mutex<MockTransportInner>>>,
}

impl Default for MockTransportInner {
    fn default() -> Self {
        Self {
            connected: false,
            generation: 0,
            events: None,
            put_items: Vec::new(),
            connect_attempts: 0,
            fail_next_connect: None,
            fail_next_put: None,
            max_asset_size: DEFAULT_MAX_ASSET_SIZE,
            peer: None,
        }
    }
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create two linked transports.
    ///
    /// Items put on one side are delivered to the other side's current
    /// session as a single-event `DataChanged` batch, after a MessagePack
    /// round-trip. Nothing is delivered while the receiving side is not
    /// connected and nothing is replayed later.
    pub fn pair() -> (Self, Self) {
        let a = Self::new();
        let b = Self::new();
        a.inner.lock().unwrap().peer = Some(Arc::downgrade(&b.inner));
        b.inner.lock().unwrap().peer = Some(Arc::downgrade(&a.inner));
        (a, b)
    }

    /// Set the asset ceiling.
    pub fn with_max_asset_size(self, limit: usize) -> Self {
        self.inner.lock().unwrap().max_asset_size = limit;
        self
    }

    /// Get all items that were put, in order.
    pub fn put_items(&self) -> Vec<DataItem> {
        let inner = self.inner.lock().unwrap();
        inner.put_items.clone()
    }

    /// Get the last item that was put.
    pub fn last_put(&self) -> Option<DataItem> {
        let inner = self.inner.lock().unwrap();
        inner.put_items.last().cloned()
    }

    /// Number of connect() calls so far, failed ones included.
    pub fn connect_attempts(&self) -> u32 {
        let inner = self.inner.lock().unwrap();
        inner.connect_attempts
    }

    /// Cause the next connect() to fail with the given code.
    pub fn fail_next_connect(&self, code: FailureCode, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_connect = Some(ConnectionFailure::new(code, error));
    }

    /// Cause the next put_data_item() to fail with the given error.
    pub fn fail_next_put(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_put = Some(error.to_string());
    }

    /// Report an interruption to the current session.
    ///
    /// Returns false if there is no session to report to.
    pub fn suspend(&self, cause: SuspendCause) -> bool {
        self.emit(TransportEvent::Suspended(cause))
    }

    /// Report recovery from an interruption.
    pub fn resume(&self) -> bool {
        self.emit(TransportEvent::Resumed)
    }

    /// Report that the transport gave up, then drop the session.
    pub fn lose(&self, code: FailureCode, error: &str) -> bool {
        let sent = self.emit(TransportEvent::Lost(ConnectionFailure::new(code, error)));
        let mut inner = self.inner.lock().unwrap();
        inner.connected = false;
        inner.events = None;
        sent
    }

    /// Deliver a record-changed batch to the current session.
    pub fn deliver(&self, events: Vec<DataEvent>) -> bool {
        self.emit(TransportEvent::DataChanged(events))
    }

    /// Clear all state (items, failures, connection). The peer link is kept.
    ///
    /// Any connect in flight is aborted.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        let peer = inner.peer.take();
        let generation = inner.generation + 1;
        *inner = MockTransportInner {
            peer,
            generation,
            ..MockTransportInner::default()
        };
    }

    fn emit(&self, event: TransportEvent) -> bool {
        let inner = self.inner.lock().unwrap();
        match inner.live_session() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

impl MockTransportInner {
    /// The session's event sender, if connected and its receiver still exists.
    fn live_session(&self) -> Option<&EventSender> {
        self.events
            .as_ref()
            .filter(|tx| self.connected && !tx.is_closed())
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, events: EventSender) -> Result<(), TransportError> {
        let generation = {
            let mut inner = self.inner.lock().unwrap();
            inner.connect_attempts += 1;

            // Check for forced failure
            if let Some(failure) = inner.fail_next_connect.take() {
                return Err(TransportError::ConnectionFailed(failure));
            }
            inner.generation
        };

        // Handshake
        tokio::task::yield_now().await;

        let mut inner = self.inner.lock().unwrap();
        if inner.generation != generation {
            return Err(TransportError::ConnectionClosed);
        }
        inner.connected = true;
        inner.events = Some(events);
        Ok(())
    }

    async fn put_data_item(&self, item: DataItem) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.connected {
            return Err(TransportError::NotConnected);
        }
        if inner.live_session().is_none() {
            return Err(TransportError::ConnectionClosed);
        }

        // Check for forced failure
        if let Some(error) = inner.fail_next_put.take() {
            return Err(TransportError::PutFailed(error));
        }

        if let Some(size) = item.data.largest_asset() {
            if size > inner.max_asset_size {
                return Err(TransportError::AssetTooLarge {
                    size,
                    limit: inner.max_asset_size,
                });
            }
        }

        // Items cross the link in wire form
        let bytes = item
            .to_bytes()
            .map_err(|e| TransportError::PutFailed(e.to_string()))?;
        let delivered =
            DataItem::from_bytes(&bytes).map_err(|e| TransportError::PutFailed(e.to_string()))?;

        inner.put_items.push(item);
        let peer = inner.peer.as_ref().and_then(Weak::upgrade);
        drop(inner);

        if let Some(peer) = peer {
            let peer = peer.lock().unwrap();
            if let Some(tx) = peer.live_session() {
                let _ = tx.send(TransportEvent::DataChanged(vec![DataEvent::changed(
                    delivered,
                )]));
            }
        }
        Ok(())
    }

    fn max_asset_size(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.max_asset_size
    }

    fn is_connected(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.live_session().is_some()
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.generation += 1;
        inner.connected = false;
        inner.events = None;
        Ok(())
    }
}
