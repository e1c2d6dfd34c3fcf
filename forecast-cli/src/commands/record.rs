//! Encode and decode forecast items as files.
//!
//! Files hold one MessagePack-encoded `DataItem`, the same form items take
//! on the wire.

use anyhow::{bail, Context, Result};
use forecast_types::{codec, Asset, DataItem, ForecastRecord};
use std::path::Path;

use crate::config::Config;

/// Forecast fields given on the command line.
#[derive(Debug)]
pub struct Fields {
    /// Publish time; `None` means now.
    pub timestamp_millis: Option<i64>,
    /// Weather condition id.
    pub weather_id: i32,
    /// Formatted high temperature.
    pub high_temp: String,
    /// Formatted low temperature.
    pub low_temp: String,
    /// Icon bytes.
    pub icon: Option<Vec<u8>>,
}

/// Encode `fields` as an item at the configured forecast path.
pub async fn encode(config: &Config, fields: Fields, out: &Path) -> Result<()> {
    let timestamp = fields.timestamp_millis.unwrap_or_else(codec::now_millis);
    let mut record = ForecastRecord::new(
        timestamp,
        fields.weather_id,
        fields.high_temp,
        fields.low_temp,
    );
    if let Some(icon) = fields.icon {
        record = record.with_icon(Asset::from_bytes(icon));
    }

    let item = DataItem::new(config.sync.forecast_path.as_str(), codec::encode(&record));
    let bytes = item.to_bytes().context("Failed to encode item")?;
    tokio::fs::write(out, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    Ok(())
}

/// Decode an item file and print the forecast it carries.
pub async fn decode(path: &Path) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let item = DataItem::from_bytes(&bytes).context("Not a data item")?;

    let record = match codec::decode(&item.data) {
        Ok(record) => record,
        Err(e) => bail!("Malformed record at {}: {}", item.path, e),
    };

    println!("Path:       {}", item.path);
    println!("Timestamp:  {}", record.timestamp_millis);
    println!("Weather id: {}", record.weather_id);
    println!("High:       {}", record.high_temp);
    println!("Low:        {}", record.low_temp);
    match record.icon {
        Some(icon) => println!("Icon:       {} bytes", icon.len()),
        None => println!("Icon:       none"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_types::codec::WEATHER_ID_KEY;
    use forecast_types::{RawRecord, FORECAST_PATH};
    use tempfile::tempdir;

    fn fields() -> Fields {
        Fields {
            timestamp_millis: Some(1_700_000_000_000),
            weather_id: 800,
            high_temp: "75°".into(),
            low_temp: "52°".into(),
            icon: Some(vec![7; 16]),
        }
    }

    #[tokio::test]
    async fn encode_writes_decodable_item() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("forecast.bin");

        encode(&Config::default(), fields(), &out).await.unwrap();

        let item = DataItem::from_bytes(&std::fs::read(&out).unwrap()).unwrap();
        assert_eq!(item.path, FORECAST_PATH);
        let record = codec::decode(&item.data).unwrap();
        assert_eq!(record.timestamp_millis, 1_700_000_000_000);
        assert_eq!(record.icon.map(|a| a.len()), Some(16));

        decode(&out).await.unwrap();
    }

    #[tokio::test]
    async fn encode_without_timestamp_uses_current_time() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("now.bin");
        let before = codec::now_millis();

        let fields = Fields {
            timestamp_millis: None,
            ..fields()
        };
        encode(&Config::default(), fields, &out).await.unwrap();

        let item = DataItem::from_bytes(&std::fs::read(&out).unwrap()).unwrap();
        let record = codec::decode(&item.data).unwrap();
        assert!(record.timestamp_millis >= before);
        assert!(record.timestamp_millis <= codec::now_millis());
    }

    #[tokio::test]
    async fn decode_reports_malformed_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.bin");
        let mut raw = RawRecord::new();
        raw.put_int(WEATHER_ID_KEY, 800);
        std::fs::write(&path, DataItem::new(FORECAST_PATH, raw).to_bytes().unwrap()).unwrap();

        let err = decode(&path).await.unwrap_err();
        assert!(err.to_string().contains("Malformed record"), "got: {}", err);
    }

    #[tokio::test]
    async fn decode_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.bin");
        std::fs::write(&path, b"not msgpack at all").unwrap();

        assert!(decode(&path).await.is_err());
    }

    #[tokio::test]
    async fn decode_missing_file() {
        let dir = tempdir().unwrap();
        let err = decode(&dir.path().join("absent.bin")).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
