//! Configuration for the sync roles.

use forecast_types::{FORECAST_PATH, FORECAST_UPDATE_PATH};
use serde::Deserialize;
use std::time::Duration;

/// Configuration shared by [`Publisher`](crate::Publisher),
/// [`ChangeListener`](crate::ChangeListener) and
/// [`UpdateTrigger`](crate::UpdateTrigger).
///
/// Deserializable so that a `[sync]` table in a config file can override any
/// subset of fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Path the forecast record is published at.
    pub forecast_path: String,
    /// Path of the "please sync now" trigger record.
    pub trigger_path: String,
    /// How long a publish waits for the connection (milliseconds).
    pub connect_timeout_ms: u64,
}

impl SyncConfig {
    /// Create a configuration with the default paths and timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the forecast path.
    pub fn with_forecast_path(mut self, path: &str) -> Self {
        self.forecast_path = path.to_string();
        self
    }

    /// Set the trigger path.
    pub fn with_trigger_path(mut self, path: &str) -> Self {
        self.trigger_path = path.to_string();
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            forecast_path: FORECAST_PATH.to_string(),
            trigger_path: FORECAST_UPDATE_PATH.to_string(),
            connect_timeout_ms: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_fixed_paths() {
        let config = SyncConfig::default();
        assert_eq!(config.forecast_path, "/forecast");
        assert_eq!(config.trigger_path, "/forecast_update");
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn config_builder_pattern() {
        let config = SyncConfig::new()
            .with_forecast_path("/wx")
            .with_trigger_path("/wx_now")
            .with_connect_timeout(Duration::from_millis(250));

        assert_eq!(config.forecast_path, "/wx");
        assert_eq!(config.trigger_path, "/wx_now");
        assert_eq!(config.connect_timeout_ms, 250);
    }
}
