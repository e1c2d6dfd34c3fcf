//! UpdateTrigger - runs a local action when the companion asks for a sync.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use forecast_types::{DataEvent, DataEventKind};
use tracing::{debug, info};

use crate::connection::{RecordChangeObserver, TransportConnection};
use crate::transport::Transport;

type SyncAction = Box<dyn Fn() + Send + Sync>;

/// Fires a sync action once per remote "sync now" signal.
pub struct UpdateTrigger {
    path: String,
    action: SyncAction,
    fired: AtomicU64,
}

impl UpdateTrigger {
    /// Run `action` for every signal at `path`.
    pub fn new(path: &str, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            path: path.to_string(),
            action: Box::new(action),
            fired: AtomicU64::new(0),
        }
    }

    /// Handle one remote signal. Returns true if the action ran.
    pub fn on_remote_signal(&self, path: &str) -> bool {
        if path != self.path {
            debug!(path, "ignoring signal at unrelated path");
            return false;
        }
        info!(path, "remote sync requested");
        (self.action)();
        self.fired.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Number of times the action ran.
    pub fn fired(&self) -> u64 {
        self.fired.load(Ordering::Relaxed)
    }

    /// Subscribe at the trigger path now if `connection` is up, and on
    /// every later connect.
    pub fn listen<T: Transport>(self, connection: &TransportConnection<T>) -> Arc<Self> {
        let trigger = Arc::new(self);
        connection.keep_subscribed(
            &trigger.path,
            Arc::clone(&trigger) as Arc<dyn RecordChangeObserver>,
        );
        trigger
    }
}

impl RecordChangeObserver for UpdateTrigger {
    fn on_records_changed(&self, events: &[DataEvent]) {
        for event in events {
            if event.kind == DataEventKind::Changed {
                self.on_remote_signal(event.path());
            }
        }
    }
}

impl fmt::Debug for UpdateTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateTrigger")
            .field("path", &self.path)
            .field("fired", &self.fired())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use forecast_types::{codec, DataItem, FORECAST_PATH, FORECAST_UPDATE_PATH};
    use std::sync::atomic::AtomicUsize;

    async fn settle(done: impl Fn() -> bool) {
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while !done() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition never held");
    }

    fn counting() -> (UpdateTrigger, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&count);
        let trigger = UpdateTrigger::new(FORECAST_UPDATE_PATH, move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });
        (trigger, count)
    }

    #[test]
    fn matching_path_fires_once() {
        let (trigger, count) = counting();

        assert!(trigger.on_remote_signal(FORECAST_UPDATE_PATH));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(trigger.fired(), 1);
    }

    #[test]
    fn other_path_does_nothing() {
        let (trigger, count) = counting();

        assert!(!trigger.on_remote_signal(FORECAST_PATH));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn each_changed_event_is_one_signal() {
        let (trigger, count) = counting();
        let signal = || {
            DataEvent::changed(DataItem::new(
                FORECAST_UPDATE_PATH,
                codec::sync_request(1),
            ))
        };

        trigger.on_records_changed(&[
            signal(),
            DataEvent::deleted(FORECAST_UPDATE_PATH),
            signal(),
        ]);

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn listen_on_live_connection_subscribes_at_once() {
        let transport = MockTransport::new();
        let connection = TransportConnection::new(transport.clone());
        connection.connect();
        settle(|| connection.is_connected()).await;

        let (trigger, count) = counting();
        let trigger = trigger.listen(&connection);
        assert_eq!(connection.subscriptions().len(), 1);

        transport.deliver(vec![DataEvent::changed(DataItem::new(
            FORECAST_UPDATE_PATH,
            codec::sync_request(1),
        ))]);
        settle(|| trigger.fired() > 0).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
