//! Configuration for forecast-sync.
//!
//! Loaded from a TOML file given with `--config`. Every section and key is
//! optional:
//!
//! ```toml
//! [sync]
//! forecast_path = "/forecast"
//! trigger_path = "/forecast_update"
//! connect_timeout_ms = 10000
//!
//! [transport]
//! max_asset_bytes = 102400
//!
//! [logging]
//! filter = "info"
//! ```

use anyhow::{Context, Result};
use forecast_client::{SyncConfig, DEFAULT_MAX_ASSET_SIZE};
use serde::Deserialize;
use std::path::Path;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Paths and timeouts for the sync roles.
    pub sync: SyncConfig,
    /// Loopback transport settings.
    pub transport: TransportConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Loopback transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest asset the transport accepts, in bytes (default: 100 KiB).
    pub max_asset_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_asset_bytes: DEFAULT_MAX_ASSET_SIZE,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or defaults when no path is given.
    ///
    /// A path that cannot be read is an error, not a fallback to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.sync, SyncConfig::default());
        assert_eq!(config.transport.max_asset_bytes, 100 * 1024);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
[sync]
forecast_path = "/wx"

[transport]
max_asset_bytes = 2048
"#,
        )
        .unwrap();

        assert_eq!(config.sync.forecast_path, "/wx");
        assert_eq!(config.sync.trigger_path, "/forecast_update");
        assert_eq!(config.sync.connect_timeout_ms, 10_000);
        assert_eq!(config.transport.max_asset_bytes, 2048);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nfilter = \"debug\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[transport]\nmax_asset_bytes = \"lots\"").unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }
}
