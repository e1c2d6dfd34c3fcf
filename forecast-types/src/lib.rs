//! # forecast-types
//!
//! Record model and wire format for cross-device forecast sync.
//!
//! This crate provides the foundational types shared by every layer:
//! - [`RawRecord`], [`DataValue`], [`Asset`] - the flat key/value record
//! - [`DataItem`], [`DataEvent`] - path-addressed items and change events
//! - [`ForecastRecord`] with [`codec::encode`] / [`codec::decode`]
//! - [`RecordError`] - malformed record errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
mod error;
mod item;
mod record;

pub use codec::ForecastRecord;
pub use error::RecordError;
pub use item::{DataEvent, DataEventKind, DataItem, FORECAST_PATH, FORECAST_UPDATE_PATH};
pub use record::{Asset, DataValue, RawRecord, ValueKind};
