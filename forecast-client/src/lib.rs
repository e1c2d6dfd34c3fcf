//! # forecast-client
//!
//! Cross-device forecast sync over a pub/sub data transport.
//!
//! The primary device publishes its latest forecast; the companion device
//! listens for it and can ask for a fresh one.
//!
//! ## Features
//!
//! - **Non-blocking roles**: publish, listen and trigger never wait on the link
//! - **Transport Abstraction**: Pluggable transport layer (mock, loopback pair)
//! - **Pure State Machine**: Uses forecast-core for side-effect-free logic
//! - **Last Write Wins**: The companion holds exactly one forecast
//!
//! ## Example
//!
//! ```ignore
//! use forecast_client::{ChangeListener, MockTransport, Publisher, SyncConfig, TransportConnection};
//!
//! let (phone, watch) = MockTransport::pair();
//! let config = SyncConfig::default();
//!
//! let listener = ChangeListener::new(
//!     TransportConnection::new(watch),
//!     &config,
//!     Arc::new(|id: i32, high: &str, low: &str| println!("{id} {high}/{low}")),
//! );
//! listener.start();
//!
//! let publisher = Publisher::new(TransportConnection::new(phone), config);
//! publisher.publish(800, "75°", "52°", None).outcome().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod connection;
mod error;
mod listener;
mod publisher;
pub mod transport;
mod trigger;

pub use config::SyncConfig;
pub use connection::{
    ConnectionObserver, RecordChangeObserver, SubscriptionId, Subscriptions, TransportConnection,
};
pub use error::ClientError;
pub use listener::{ChangeListener, ForecastConsumer, ForecastDispatcher, SharedForecast};
pub use publisher::{PublishHandle, PublishReceipt, Publisher};
pub use transport::{
    EventSender, MockTransport, Transport, TransportError, TransportEvent, DEFAULT_MAX_ASSET_SIZE,
};
pub use trigger::UpdateTrigger;
