//! dblog protocol - event data model and wire format
//!
//! This crate provides the types that flow from the event source into the
//! pipeline:
//! - `Field` / `FieldValue` - one named, typed value from a record
//! - `Record` - an ordered sequence of fields (order is significant)
//! - `SourceEvent` - the three event kinds the source delivers
//!
//! # Wire format
//!
//! Each event is framed with a 4-byte big-endian length prefix:
//!
//! ```text
//! [4 bytes: length (big-endian)][N bytes: event payload]
//! ```
//!
//! The payload starts with an event-kind byte, followed by a u16-prefixed
//! table name, and for record events a field list. Every field value is
//! length-prefixed so unrecognized type tags can be carried through without
//! aborting the record. Decoding happens once, here, at the boundary: the
//! rest of the pipeline only ever sees typed values.

mod error;
mod event;
mod field;

pub use error::ProtocolError;
pub use event::{decode_event, encode_event, encode_frame, EventKind, SourceEvent};
pub use field::{Field, FieldValue, Record, Transport};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Length prefix size (4 bytes, big-endian u32)
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum event payload size (16MB)
pub const MAX_EVENT_SIZE: u32 = 16 * 1024 * 1024;
