//! Forecast record codec.
//!
//! Maps a [`ForecastRecord`] to and from a flat [`RawRecord`]. The mapping is
//! purely structural: temperatures travel as display strings and are never
//! parsed or converted here.
//!
//! # Keys
//!
//! | Key | Kind | Required |
//! |-----|------|----------|
//! | [`TIMESTAMP_KEY`] | int | yes |
//! | [`WEATHER_ID_KEY`] | int (fits i32) | yes |
//! | [`HIGH_TEMP_KEY`] | text | yes |
//! | [`LOW_TEMP_KEY`] | text | yes |
//! | [`ICON_KEY`] | asset | no |
//! | [`VERSION_KEY`] | int | no (absent means 1) |
//!
//! Unknown keys are ignored so newer publishers can add fields.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Asset, DataValue, RawRecord, RecordError, ValueKind};

/// Publish time in milliseconds since the Unix epoch.
pub const TIMESTAMP_KEY: &str = "forecast.timestamp";
/// Weather condition id.
pub const WEATHER_ID_KEY: &str = "forecast.weather_id";
/// Formatted high temperature.
pub const HIGH_TEMP_KEY: &str = "forecast.high_temp";
/// Formatted low temperature.
pub const LOW_TEMP_KEY: &str = "forecast.low_temp";
/// Optional icon image bytes.
pub const ICON_KEY: &str = "forecast.icon";
/// Record schema version.
pub const VERSION_KEY: &str = "forecast.version";

/// The only schema version this codec reads or writes.
pub const RECORD_VERSION: i64 = 1;

/// One synchronized forecast.
///
/// Immutable by convention: a new forecast is a new record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRecord {
    /// Publish time in milliseconds since the Unix epoch
    pub timestamp_millis: i64,
    /// Weather condition id
    pub weather_id: i32,
    /// Formatted high temperature, e.g. `"75°"`
    pub high_temp: String,
    /// Formatted low temperature, e.g. `"52°"`
    pub low_temp: String,
    /// Optional icon; `None` means "no new icon"
    pub icon: Option<Asset>,
}

impl ForecastRecord {
    /// Create a record without an icon.
    pub fn new(
        timestamp_millis: i64,
        weather_id: i32,
        high_temp: impl Into<String>,
        low_temp: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_millis,
            weather_id,
            high_temp: high_temp.into(),
            low_temp: low_temp.into(),
            icon: None,
        }
    }

    /// Attach an icon.
    pub fn with_icon(mut self, icon: Asset) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Encode into a raw record. See [`encode`].
    pub fn to_raw(&self) -> RawRecord {
        encode(self)
    }

    /// Decode from a raw record. See [`decode`].
    pub fn from_raw(raw: &RawRecord) -> Result<Self, RecordError> {
        decode(raw)
    }
}

/// Encode a forecast into a raw record.
///
/// Never fails. An absent icon omits [`ICON_KEY`] entirely rather than
/// writing an empty asset.
pub fn encode(record: &ForecastRecord) -> RawRecord {
    let mut raw = RawRecord::new();
    raw.put_int(VERSION_KEY, RECORD_VERSION);
    raw.put_int(TIMESTAMP_KEY, record.timestamp_millis);
    raw.put_int(WEATHER_ID_KEY, i64::from(record.weather_id));
    raw.put_text(HIGH_TEMP_KEY, record.high_temp.clone());
    raw.put_text(LOW_TEMP_KEY, record.low_temp.clone());
    if let Some(icon) = &record.icon {
        raw.put_asset(ICON_KEY, icon.clone());
    }
    raw
}

/// Decode a raw record into a forecast.
///
/// Strict: every required key must be present with the right kind, or the
/// whole record is rejected. There is no partially-populated result.
pub fn decode(raw: &RawRecord) -> Result<ForecastRecord, RecordError> {
    match raw.get(VERSION_KEY) {
        None | Some(DataValue::Int(RECORD_VERSION)) => {}
        Some(DataValue::Int(other)) => return Err(RecordError::UnsupportedVersion(*other)),
        Some(other) => return Err(wrong_type(VERSION_KEY, ValueKind::Int, other)),
    }

    let timestamp_millis = required_int(raw, TIMESTAMP_KEY)?;
    let weather_raw = required_int(raw, WEATHER_ID_KEY)?;
    let weather_id = i32::try_from(weather_raw).map_err(|_| RecordError::OutOfRange {
        key: WEATHER_ID_KEY,
        value: weather_raw,
    })?;
    let high_temp = required_text(raw, HIGH_TEMP_KEY)?;
    let low_temp = required_text(raw, LOW_TEMP_KEY)?;

    let icon = match raw.get(ICON_KEY) {
        None => None,
        Some(DataValue::Asset(asset)) => Some(asset.clone()),
        Some(other) => return Err(wrong_type(ICON_KEY, ValueKind::Asset, other)),
    };

    Ok(ForecastRecord {
        timestamp_millis,
        weather_id,
        high_temp,
        low_temp,
        icon,
    })
}

/// Build the record published at the trigger path.
///
/// Only the timestamp is carried; it makes every request a distinct change.
pub fn sync_request(timestamp_millis: i64) -> RawRecord {
    let mut raw = RawRecord::new();
    raw.put_int(TIMESTAMP_KEY, timestamp_millis);
    raw
}

/// Current wall-clock time in milliseconds since the Unix epoch.
///
/// The timestamp carried by freshly built records.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn required_int(raw: &RawRecord, key: &'static str) -> Result<i64, RecordError> {
    match raw.get(key) {
        Some(DataValue::Int(value)) => Ok(*value),
        Some(other) => Err(wrong_type(key, ValueKind::Int, other)),
        None => Err(RecordError::MissingKey(key)),
    }
}

fn required_text(raw: &RawRecord, key: &'static str) -> Result<String, RecordError> {
    match raw.get(key) {
        Some(DataValue::Text(value)) => Ok(value.clone()),
        Some(other) => Err(wrong_type(key, ValueKind::Text, other)),
        None => Err(RecordError::MissingKey(key)),
    }
}

fn wrong_type(key: &'static str, expected: ValueKind, found: &DataValue) -> RecordError {
    RecordError::WrongType {
        key,
        expected,
        found: found.kind(),
    }
}
