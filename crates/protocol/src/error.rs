//! Protocol error types
//!
//! Errors that can occur when decoding events from the wire.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload is too short to contain required fields
    #[error("payload too short: expected at least {expected} bytes, got {actual}")]
    PayloadTooShort { expected: usize, actual: usize },

    /// Unknown event kind byte
    #[error("unknown event kind: {0}")]
    UnknownEventKind(u8),

    /// Table name is not valid UTF-8
    #[error("table name is not valid UTF-8")]
    InvalidTableName,

    /// Field name is not valid UTF-8
    #[error("field name is not valid UTF-8")]
    InvalidFieldName,

    /// Field value payload does not match its declared type
    #[error("field '{field}' has invalid {kind} value ({len} bytes)")]
    InvalidFieldValue {
        field: String,
        kind: &'static str,
        len: usize,
    },

    /// Trailing garbage after the event payload
    #[error("trailing bytes after event payload: {0}")]
    TrailingBytes(usize),

    /// Event payload exceeds the maximum size
    #[error("event size {size} exceeds limit {limit}")]
    EventTooLarge { size: u32, limit: u32 },
}

impl ProtocolError {
    /// Create a payload too short error
    #[inline]
    pub fn too_short(expected: usize, actual: usize) -> Self {
        Self::PayloadTooShort { expected, actual }
    }

    /// Create an invalid field value error
    #[inline]
    pub fn invalid_value(field: impl Into<String>, kind: &'static str, len: usize) -> Self {
        Self::InvalidFieldValue {
            field: field.into(),
            kind,
            len,
        }
    }
}
