//! The consumer's current forecast.
//!
//! The companion holds at most one forecast at a time. Every well-formed
//! record that arrives replaces it outright: last write wins, by arrival
//! order, with no field-level merge.

use forecast_types::ForecastRecord;

/// Holder for the most recently received forecast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestForecast {
    current: Option<ForecastRecord>,
    replacements: u64,
}

impl LatestForecast {
    /// Create an empty holder (nothing received yet).
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held forecast, returning the previous one.
    pub fn replace(&mut self, record: ForecastRecord) -> Option<ForecastRecord> {
        self.replacements += 1;
        self.current.replace(record)
    }

    /// The held forecast, if any has been received.
    pub fn current(&self) -> Option<&ForecastRecord> {
        self.current.as_ref()
    }

    /// Whether a forecast has ever been received.
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Number of records accepted so far.
    pub fn replacements(&self) -> u64 {
        self.replacements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: i64, weather_id: i32) -> ForecastRecord {
        ForecastRecord::new(ts, weather_id, "70°", "50°")
    }

    #[test]
    fn starts_empty() {
        let latest = LatestForecast::new();
        assert!(latest.is_empty());
        assert!(latest.current().is_none());
        assert_eq!(latest.replacements(), 0);
    }

    #[test]
    fn later_write_wins() {
        let mut latest = LatestForecast::new();
        latest.replace(record(1, 500));
        latest.replace(record(2, 800));

        assert_eq!(latest.current(), Some(&record(2, 800)));
        assert_eq!(latest.replacements(), 2);
    }

    #[test]
    fn replace_is_unconditional() {
        let mut latest = LatestForecast::new();
        latest.replace(record(20, 800));
        let previous = latest.replace(record(10, 300));

        assert_eq!(previous, Some(record(20, 800)));
        assert_eq!(latest.current(), Some(&record(10, 300)));
    }

    #[test]
    fn replace_does_not_merge_fields() {
        let mut latest = LatestForecast::new();
        latest.replace(
            record(1, 800).with_icon(forecast_types::Asset::from_bytes(vec![1, 2, 3])),
        );
        latest.replace(record(2, 800));

        assert!(latest.current().unwrap().icon.is_none());
    }
}
