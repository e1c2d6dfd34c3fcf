//! RawRecord - the transport-agnostic key/value map carried by a data item.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::RecordError;

/// Kind of value stored under a record key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// 64-bit signed integer
    Int,
    /// UTF-8 string
    Text,
    /// Binary asset
    Asset,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Text => f.write_str("text"),
            Self::Asset => f.write_str("asset"),
        }
    }
}

/// Raw binary payload, typically an encoded image.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset(Vec<u8>);

impl Asset {
    /// Wrap raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Size of the asset in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the asset carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the asset and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Asset([{} bytes])", self.0.len())
    }
}

/// A single typed value in a [`RawRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataValue {
    /// Integer value (wire int64)
    Int(i64),
    /// String value
    Text(String),
    /// Binary asset
    Asset(Asset),
}

impl DataValue {
    /// The kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Int(_) => ValueKind::Int,
            Self::Text(_) => ValueKind::Text,
            Self::Asset(_) => ValueKind::Asset,
        }
    }
}

/// Flat mapping from string key to typed value.
///
/// Keys are unordered on the wire; a `BTreeMap` keeps the encoded bytes
/// deterministic for identical records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    fields: BTreeMap<String, DataValue>,
}

impl RawRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an integer under `key`, replacing any previous value.
    pub fn put_int(&mut self, key: &str, value: i64) {
        self.fields.insert(key.to_string(), DataValue::Int(value));
    }

    /// Store a string under `key`, replacing any previous value.
    pub fn put_text(&mut self, key: &str, value: impl Into<String>) {
        self.fields
            .insert(key.to_string(), DataValue::Text(value.into()));
    }

    /// Store an asset under `key`, replacing any previous value.
    pub fn put_asset(&mut self, key: &str, asset: Asset) {
        self.fields.insert(key.to_string(), DataValue::Asset(asset));
    }

    /// Remove a key, returning its value if present.
    pub fn remove(&mut self, key: &str) -> Option<DataValue> {
        self.fields.remove(key)
    }

    /// Look up the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&DataValue> {
        self.fields.get(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of keys in the record.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no keys.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over all keys and values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Size in bytes of the largest asset in the record, if any.
    ///
    /// Transports compare this against their asset ceiling.
    pub fn largest_asset(&self) -> Option<usize> {
        self.fields
            .values()
            .filter_map(|v| match v {
                DataValue::Asset(asset) => Some(asset.len()),
                _ => None,
            })
            .max()
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
