//! TransportConnection - the connection lifecycle to the transport.
//!
//! # Architecture
//!
//! The connection feeds events into the pure state machine from
//! forecast-core and interprets the actions it returns:
//!
//! ```text
//! connect() ──► ConnectionState::on_event ──► actions
//!                                              ├─ Connect        → spawn session
//!                                              ├─ Open/Release   → Subscriptions
//!                                              ├─ Notify         → ConnectionObserver
//!                                              └─ Disconnect     → Transport::close
//! ```
//!
//! Each connect attempt runs one *session*: a task that performs the
//! transport connect, then drains the session's event channel. Every
//! observer and subscription callback for that session runs on this task,
//! one at a time, in arrival order.
//!
//! `disconnect()` advances the session epoch; a session that finds itself
//! stale stops delivering.
//!
//! # Example
//!
//! ```ignore
//! let connection = TransportConnection::new(MockTransport::new());
//! connection.add_observer(Arc::new(MyObserver));
//! connection.connect();            // returns immediately
//! // ... MyObserver::on_connected fires on the session task
//! connection.disconnect().await?;
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use forecast_core::{
    Action, ConnectionEvent, ConnectionFailure, ConnectionState, Event, SuspendCause,
};
use forecast_types::{DataEvent, DataItem};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::transport::{Transport, TransportEvent};

/// Receives connection lifecycle callbacks.
///
/// Callbacks run on the session's notification task and must not block.
pub trait ConnectionObserver: Send + Sync {
    /// The connection reached `Connected` (initially or after recovery).
    ///
    /// Subscriptions are open at this point; anything registered before a
    /// suspension has been released and must be registered again.
    fn on_connected(&self, subscriptions: &Subscriptions) {
        let _ = subscriptions;
    }

    /// The connection was interrupted.
    fn on_connection_suspended(&self, cause: SuspendCause) {
        let _ = cause;
    }

    /// The connection attempt failed or a suspension was given up.
    fn on_connection_failed(&self, failure: &ConnectionFailure) {
        let _ = failure;
    }
}

/// Receives record-changed batches for a subscribed path.
pub trait RecordChangeObserver: Send + Sync {
    /// Handle the events of one batch, in transport order.
    fn on_records_changed(&self, events: &[DataEvent]);
}

/// Identifies a registered subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    path: String,
    observer: Arc<dyn RecordChangeObserver>,
}

#[derive(Default)]
struct SubscriptionTable {
    open: bool,
    next_id: u64,
    entries: Vec<Subscription>,
}

/// The live subscriptions of a connection.
///
/// Open only while the connection is `Connected`. Suspension, failure and
/// disconnect release every entry.
#[derive(Default)]
pub struct Subscriptions {
    table: Mutex<SubscriptionTable>,
}

impl Subscriptions {
    /// Register `observer` for changes at `path`.
    ///
    /// Fails with [`ClientError::NotConnected`] unless the connection is
    /// `Connected`.
    pub fn subscribe(
        &self,
        path: &str,
        observer: Arc<dyn RecordChangeObserver>,
    ) -> Result<SubscriptionId, ClientError> {
        let mut table = self.lock();
        if !table.open {
            return Err(ClientError::NotConnected);
        }
        table.next_id += 1;
        let id = SubscriptionId(table.next_id);
        table.entries.push(Subscription {
            id,
            path: path.to_string(),
            observer,
        });
        debug!(path, "subscribed");
        Ok(id)
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut table = self.lock();
        let before = table.entries.len();
        table.entries.retain(|s| s.id != id);
        table.entries.len() != before
    }

    /// Whether `id` is still registered.
    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.lock().entries.iter().any(|s| s.id == id)
    }

    /// Whether new subscriptions are accepted.
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether there are no live subscriptions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn open(&self) {
        self.lock().open = true;
    }

    fn release(&self) -> usize {
        let mut table = self.lock();
        table.open = false;
        let released = table.entries.len();
        table.entries.clear();
        released
    }

    /// Hand each subscription the events of `batch` at its path.
    fn dispatch(&self, batch: &[DataEvent]) {
        let targets: Vec<(String, Arc<dyn RecordChangeObserver>)> = {
            let table = self.lock();
            if !table.open {
                debug!(events = batch.len(), "dropping batch: subscriptions closed");
                return;
            }
            table
                .entries
                .iter()
                .map(|s| (s.path.clone(), Arc::clone(&s.observer)))
                .collect()
        };

        for (path, observer) in targets {
            let matching: Vec<DataEvent> = batch
                .iter()
                .filter(|event| event.path() == path)
                .cloned()
                .collect();
            if !matching.is_empty() {
                observer.on_records_changed(&matching);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, SubscriptionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.lock();
        f.debug_struct("Subscriptions")
            .field("open", &table.open)
            .field("len", &table.entries.len())
            .finish()
    }
}

/// Observer that (re-)registers one subscription every time the connection
/// reaches `Connected`.
///
/// This is how long-lived roles keep their subscription across suspension
/// and reconnection. At most one subscription is live at a time.
pub(crate) struct SubscribeOnConnect {
    path: String,
    observer: Arc<dyn RecordChangeObserver>,
    current: Mutex<Option<SubscriptionId>>,
}

impl SubscribeOnConnect {
    /// Subscribe `observer` at `path` on every connect.
    pub fn new(path: &str, observer: Arc<dyn RecordChangeObserver>) -> Self {
        Self {
            path: path.to_string(),
            observer,
            current: Mutex::new(None),
        }
    }

    /// Subscribe unless the previous subscription is still live.
    fn ensure(&self, subscriptions: &Subscriptions) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if (*current).is_some_and(|id| subscriptions.contains(id)) {
            return;
        }
        match subscriptions.subscribe(&self.path, Arc::clone(&self.observer)) {
            Ok(id) => *current = Some(id),
            Err(e) => warn!(path = %self.path, error = %e, "could not subscribe"),
        }
    }
}

impl ConnectionObserver for SubscribeOnConnect {
    fn on_connected(&self, subscriptions: &Subscriptions) {
        self.ensure(subscriptions);
    }

    fn on_connection_suspended(&self, cause: SuspendCause) {
        debug!(path = %self.path, %cause, "subscription released until recovery");
    }
}

/// Connection to a transport, driven by the forecast-core state machine.
///
/// Cheap to clone; clones share the same connection.
pub struct TransportConnection<T: Transport> {
    inner: Arc<ConnectionInner<T>>,
}

struct ConnectionInner<T> {
    transport: T,
    state: watch::Sender<ConnectionState>,
    epoch: AtomicU64,
    observers: RwLock<Vec<Arc<dyn ConnectionObserver>>>,
    subscriptions: Subscriptions,
}

impl<T: Transport> TransportConnection<T> {
    /// Create a disconnected connection over `transport`.
    pub fn new(transport: T) -> Self {
        let (state, _) = watch::channel(ConnectionState::new());
        Self {
            inner: Arc::new(ConnectionInner {
                transport,
                state,
                epoch: AtomicU64::new(0),
                observers: RwLock::new(Vec::new()),
                subscriptions: Subscriptions::default(),
            }),
        }
    }

    /// Register a lifecycle observer.
    pub fn add_observer(&self, observer: Arc<dyn ConnectionObserver>) {
        self.inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.inner.state.borrow().is_connected()
    }

    /// The live subscriptions.
    pub fn subscriptions(&self) -> &Subscriptions {
        &self.inner.subscriptions
    }

    /// Register `observer` for changes at `path`. See [`Subscriptions::subscribe`].
    pub fn subscribe(
        &self,
        path: &str,
        observer: Arc<dyn RecordChangeObserver>,
    ) -> Result<SubscriptionId, ClientError> {
        self.inner.subscriptions.subscribe(path, observer)
    }

    /// Keep `observer` subscribed at `path` for the life of this connection.
    ///
    /// Subscribes at once if already `Connected`, and again every time the
    /// connection comes back.
    pub fn keep_subscribed(&self, path: &str, observer: Arc<dyn RecordChangeObserver>) {
        let keeper = Arc::new(SubscribeOnConnect::new(path, observer));
        self.add_observer(Arc::clone(&keeper) as Arc<dyn ConnectionObserver>);
        if self.is_connected() {
            keeper.ensure(&self.inner.subscriptions);
        }
    }

    /// Largest asset the transport accepts, in bytes.
    pub fn max_asset_size(&self) -> usize {
        self.inner.transport.max_asset_size()
    }

    /// Get a reference to the underlying transport (for testing).
    pub fn transport(&self) -> &T {
        &self.inner.transport
    }

    /// Start connecting.
    ///
    /// Idempotent and non-blocking: the result is reported to observers.
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) {
        let Some((epoch, actions)) = self.apply(None, Event::ConnectRequested) else {
            return;
        };
        if actions.contains(&Action::Connect) {
            debug!(epoch, "starting connection session");
            let connection = self.clone();
            tokio::spawn(async move { connection.run_session(epoch).await });
        }
    }

    /// Disconnect from any state.
    ///
    /// Subscriptions are released immediately and the current session stops
    /// delivering callbacks. In-flight publishes resolve as `NotConnected`.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let actions = self
            .apply(None, Event::DisconnectRequested)
            .map(|(_, actions)| actions)
            .unwrap_or_default();
        if actions.contains(&Action::Disconnect) {
            self.inner
                .transport
                .close()
                .await
                .map_err(ClientError::Transport)?;
            info!("transport disconnected");
        }
        Ok(())
    }

    /// Hand an item to the transport.
    ///
    /// Fails fast with `NotConnected` unless `Connected`. One attempt only.
    pub async fn put_data_item(&self, item: DataItem) -> Result<(), ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected);
        }
        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let result = self.inner.transport.put_data_item(item).await;
        if !self.is_current(epoch) {
            // Disconnected while the put was in flight
            return Err(ClientError::NotConnected);
        }
        result.map_err(ClientError::from_put)
    }

    /// Wait until the connection settles, bounded by `timeout`.
    ///
    /// Used by background publish tasks only; callers proceed from
    /// [`ConnectionObserver::on_connected`] instead.
    pub(crate) async fn wait_connected(&self, timeout: Duration) -> Result<(), ClientError> {
        let mut states = self.inner.state.subscribe();
        let wait = async move {
            loop {
                let outcome = {
                    let state = states.borrow_and_update();
                    match &*state {
                        ConnectionState::Connected => Some(Ok(())),
                        ConnectionState::Failed { failure } => {
                            Some(Err(ClientError::ConnectionFailed(failure.clone())))
                        }
                        ConnectionState::Disconnected => Some(Err(ClientError::NotConnected)),
                        ConnectionState::Connecting | ConnectionState::Suspended { .. } => None,
                    }
                };
                if let Some(outcome) = outcome {
                    return outcome;
                }
                if states.changed().await.is_err() {
                    return Err(ClientError::NotConnected);
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .unwrap_or_else(|_| Err(ClientError::ConnectionFailed(ConnectionFailure::timeout())))
    }

    async fn run_session(self, epoch: u64) {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let result = self.inner.transport.connect(events_tx).await;

        let event = match result {
            Ok(()) => Event::ConnectSucceeded,
            Err(e) => Event::ConnectFailed {
                failure: e.into_failure(),
            },
        };
        let succeeded = event == Event::ConnectSucceeded;
        if self.apply(Some(epoch), event).is_none() {
            debug!(epoch, "discarding connect result of stale session");
            return;
        }
        if !succeeded {
            return;
        }

        while let Some(event) = events_rx.recv().await {
            let (event, last) = match event {
                TransportEvent::DataChanged(batch) => {
                    if !self.is_current(epoch) {
                        debug!(epoch, "session superseded");
                        break;
                    }
                    self.inner.subscriptions.dispatch(&batch);
                    continue;
                }
                TransportEvent::Suspended(cause) => (Event::Interrupted { cause }, false),
                TransportEvent::Resumed => (Event::Recovered, false),
                TransportEvent::Lost(failure) => (Event::Lost { failure }, true),
            };
            if self.apply(Some(epoch), event).is_none() {
                debug!(epoch, "session superseded");
                break;
            }
            if last {
                break;
            }
        }
        debug!(epoch, "connection session ended");
    }

    /// Run the state machine and perform the actions that need no I/O.
    ///
    /// With `session` set, the event comes from that session and is dropped
    /// (returning `None`) unless that session is still current. The epoch
    /// check, epoch bumps and subscription changes all happen under the
    /// state lock, so a stale session never touches a newer session's state.
    ///
    /// Returns the current epoch and the actions the caller must perform
    /// (`Connect`, `Disconnect`).
    fn apply(&self, session: Option<u64>, event: Event) -> Option<(u64, Vec<Action>)> {
        let mut applied = None;
        self.inner.state.send_if_modified(|state| {
            if session.is_some_and(|epoch| !self.is_current(epoch)) {
                return false;
            }
            if event == Event::DisconnectRequested {
                self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            }
            let (next, actions) = state.clone().on_event(event);
            for action in &actions {
                match action {
                    Action::Connect => {
                        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
                    }
                    Action::OpenSubscriptions => self.inner.subscriptions.open(),
                    Action::ReleaseSubscriptions => {
                        let released = self.inner.subscriptions.release();
                        if released > 0 {
                            debug!(released, "subscriptions released");
                        }
                    }
                    _ => {}
                }
            }
            let modified = *state != next;
            *state = next;
            applied = Some((self.inner.epoch.load(Ordering::SeqCst), actions));
            modified
        });
        let (epoch, actions) = applied?;

        let mut deferred = Vec::new();
        for action in actions {
            match action {
                Action::OpenSubscriptions | Action::ReleaseSubscriptions => {}
                Action::Notify(event) => self.notify(event),
                other => deferred.push(other),
            }
        }
        Some((epoch, deferred))
    }

    fn notify(&self, event: ConnectionEvent) {
        match &event {
            ConnectionEvent::Connected => info!("transport connected"),
            ConnectionEvent::Suspended { cause } => {
                warn!(%cause, "transport connection suspended")
            }
            ConnectionEvent::Failed { failure } => warn!(%failure, "transport connection failed"),
        }

        let observers: Vec<Arc<dyn ConnectionObserver>> = self
            .inner
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            match &event {
                ConnectionEvent::Connected => observer.on_connected(&self.inner.subscriptions),
                ConnectionEvent::Suspended { cause } => observer.on_connection_suspended(*cause),
                ConnectionEvent::Failed { failure } => observer.on_connection_failed(failure),
            }
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.epoch.load(Ordering::SeqCst) == epoch
    }
}

impl<T: Transport> Clone for TransportConnection<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> fmt::Debug for TransportConnection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportConnection")
            .field("state", &*self.inner.state.borrow())
            .field("subscriptions", &self.inner.subscriptions)
            .finish()
    }
}
