//! Data items and change events - what the transport stores and delivers.

use serde::{Deserialize, Serialize};

use crate::{RawRecord, RecordError};

/// Logical path of the forecast record.
pub const FORECAST_PATH: &str = "/forecast";

/// Logical path of the "please sync now" trigger record.
pub const FORECAST_UPDATE_PATH: &str = "/forecast_update";

/// A record addressed by a logical path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    /// Logical path, e.g. [`FORECAST_PATH`]
    pub path: String,
    /// The record stored at that path
    pub data: RawRecord,
}

impl DataItem {
    /// Create an item at `path`.
    pub fn new(path: impl Into<String>, data: RawRecord) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordError> {
        rmp_serde::to_vec(self).map_err(RecordError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordError> {
        rmp_serde::from_slice(bytes).map_err(RecordError::Deserialization)
    }
}

/// What happened to a data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataEventKind {
    /// The item was created or replaced
    Changed,
    /// The item was removed
    Deleted,
}

/// One entry of a record-changed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEvent {
    /// Change kind
    pub kind: DataEventKind,
    /// The affected item (empty record for deletions)
    pub item: DataItem,
}

impl DataEvent {
    /// An event for a created or replaced item.
    pub fn changed(item: DataItem) -> Self {
        Self {
            kind: DataEventKind::Changed,
            item,
        }
    }

    /// An event for a removed item.
    pub fn deleted(path: impl Into<String>) -> Self {
        Self {
            kind: DataEventKind::Deleted,
            item: DataItem::new(path, RawRecord::new()),
        }
    }

    /// Logical path of the affected item.
    pub fn path(&self) -> &str {
        &self.item.path
    }
}
