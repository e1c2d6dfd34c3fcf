//! Error types for forecast records.

use thiserror::Error;

use crate::ValueKind;

/// Errors produced while decoding a record or its wire bytes.
///
/// Every variant means the record is malformed: consumers drop it and keep
/// whatever state they held before.
#[derive(Debug, Error)]
pub enum RecordError {
    /// A required key is absent
    #[error("missing required key: {0}")]
    MissingKey(&'static str),

    /// A key holds a value of the wrong kind
    #[error("key {key} has wrong type: expected {expected}, found {found}")]
    WrongType {
        /// The offending key
        key: &'static str,
        /// Kind the codec requires
        expected: ValueKind,
        /// Kind actually present
        found: ValueKind,
    },

    /// An integer does not fit the field it encodes
    #[error("key {key} out of range: {value}")]
    OutOfRange {
        /// The offending key
        key: &'static str,
        /// The raw wire value
        value: i64,
    },

    /// The record carries a schema version this codec does not know
    #[error("unsupported record version: {0}")]
    UnsupportedVersion(i64),

    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),
}
