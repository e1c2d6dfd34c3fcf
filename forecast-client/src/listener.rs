//! ChangeListener - the companion device's side of forecast sync.
//!
//! The listener keeps one subscription at the forecast path alive across
//! suspension and reconnection. Every changed item is decoded and, if
//! valid, replaces the latest forecast before the consumer is told.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use forecast_core::LatestForecast;
use forecast_types::{codec, DataEvent, DataEventKind, ForecastRecord};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::connection::{RecordChangeObserver, TransportConnection};
use crate::error::ClientError;
use crate::transport::Transport;

/// Receives decoded forecasts.
///
/// Called on the connection's notification task, once per accepted record,
/// in arrival order.
pub trait ForecastConsumer: Send + Sync {
    /// A new forecast replaced the previous one.
    fn on_forecast_updated(&self, weather_id: i32, high_temp: &str, low_temp: &str);
}

impl<F> ForecastConsumer for F
where
    F: Fn(i32, &str, &str) + Send + Sync,
{
    fn on_forecast_updated(&self, weather_id: i32, high_temp: &str, low_temp: &str) {
        self(weather_id, high_temp, low_temp)
    }
}

/// Latest-forecast state shared between the dispatcher and readers.
pub type SharedForecast = Arc<Mutex<LatestForecast>>;

/// Decodes record-changed batches and forwards valid forecasts.
pub struct ForecastDispatcher {
    path: String,
    state: SharedForecast,
    consumer: Arc<dyn ForecastConsumer>,
}

impl ForecastDispatcher {
    /// Dispatch changes at `path` into `state` and `consumer`.
    pub fn new(path: &str, state: SharedForecast, consumer: Arc<dyn ForecastConsumer>) -> Self {
        Self {
            path: path.to_string(),
            state,
            consumer,
        }
    }

    /// Process one batch in order. Returns the number of forecasts delivered.
    ///
    /// Deletions and items at other paths are skipped. A malformed record is
    /// logged and dropped; the rest of the batch still goes through.
    pub fn dispatch(&self, events: &[DataEvent]) -> usize {
        let mut delivered = 0;
        for event in events {
            if event.kind != DataEventKind::Changed {
                debug!(path = event.path(), "ignoring deleted item");
                continue;
            }
            if event.path() != self.path {
                debug!(path = event.path(), "ignoring item at unrelated path");
                continue;
            }

            let record = match codec::decode(&event.item.data) {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = event.path(), error = %e, "dropping malformed forecast record");
                    continue;
                }
            };

            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(record.clone());
            info!(
                weather_id = record.weather_id,
                timestamp_millis = record.timestamp_millis,
                "forecast updated"
            );
            self.consumer
                .on_forecast_updated(record.weather_id, &record.high_temp, &record.low_temp);
            delivered += 1;
        }
        delivered
    }

    /// The state this dispatcher writes.
    pub fn state(&self) -> &SharedForecast {
        &self.state
    }
}

impl RecordChangeObserver for ForecastDispatcher {
    fn on_records_changed(&self, events: &[DataEvent]) {
        self.dispatch(events);
    }
}

impl fmt::Debug for ForecastDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForecastDispatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Listens for forecasts published by the primary device.
pub struct ChangeListener<T: Transport> {
    connection: TransportConnection<T>,
    dispatcher: Arc<ForecastDispatcher>,
}

impl<T: Transport> ChangeListener<T> {
    /// Create a listener that forwards forecasts to `consumer`.
    ///
    /// The subscription is registered now if `connection` is already
    /// `Connected`, and again every time it reaches `Connected`. Does not
    /// connect; call [`start`](Self::start).
    pub fn new(
        connection: TransportConnection<T>,
        config: &SyncConfig,
        consumer: Arc<dyn ForecastConsumer>,
    ) -> Self {
        let dispatcher = Arc::new(ForecastDispatcher::new(
            &config.forecast_path,
            SharedForecast::default(),
            consumer,
        ));
        connection.keep_subscribed(
            &config.forecast_path,
            Arc::clone(&dispatcher) as Arc<dyn RecordChangeObserver>,
        );
        Self {
            connection,
            dispatcher,
        }
    }

    /// Start listening. Non-blocking.
    pub fn start(&self) {
        self.connection.connect();
    }

    /// Stop listening and disconnect.
    pub async fn stop(&self) -> Result<(), ClientError> {
        self.connection.disconnect().await
    }

    /// The most recent valid forecast, if any arrived.
    pub fn forecast(&self) -> Option<ForecastRecord> {
        self.dispatcher
            .state()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current()
            .cloned()
    }

    /// Shared handle to the latest-forecast state.
    pub fn shared_forecast(&self) -> SharedForecast {
        Arc::clone(self.dispatcher.state())
    }

    /// The connection this listener reads from.
    pub fn connection(&self) -> &TransportConnection<T> {
        &self.connection
    }
}
