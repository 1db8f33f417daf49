//! Event decoding from wire payloads
//!
//! The event source delivers three event kinds:
//! - `record(table, record)` - one row's worth of data for a table
//! - `flush_table(table)` - end the open load for one table now
//! - `flush_all()` - end every open load now
//!
//! # Payload layout
//!
//! ```text
//! [1 byte: event kind]
//! [u16: table name length][table name]          (record, flush_table)
//! [u16: field count]                            (record only)
//!   per field:
//!     [u16: name length][name]
//!     [1 byte: type tag]
//!     [u32: value length][value]
//! ```
//!
//! All integers are big-endian. Field values carry their own length so a
//! type tag this build does not recognize can be skipped and degraded
//! downstream instead of desynchronizing the decoder. A truncated value is
//! a hard error for the whole record: the event is rejected and no partial
//! row ever reaches a table session.

use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};

use crate::field::{Field, FieldValue, Record, Transport};
use crate::{ProtocolError, Result};

// =============================================================================
// Event kinds
// =============================================================================

/// Event kind discriminant on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    /// A record destined for one table
    Record = 1,
    /// Flush one table's open load
    FlushTable = 2,
    /// Flush every open load
    FlushAll = 3,
}

impl EventKind {
    /// Parse from raw byte value
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Record),
            2 => Some(Self::FlushTable),
            3 => Some(Self::FlushAll),
            _ => None,
        }
    }
}

/// A decoded event from the source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// One record for `table`
    Record { table: String, record: Record },
    /// Explicit flush request for `table`
    FlushTable { table: String },
    /// Explicit flush request for every table
    FlushAll,
}

// =============================================================================
// Field type tags
// =============================================================================

const TAG_INT: u8 = 1;
const TAG_COUNT: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_DOUBLE: u8 = 4;
const TAG_TIME: u8 = 5;
const TAG_INTERVAL: u8 = 6;
const TAG_PORT: u8 = 7;
const TAG_ADDR: u8 = 8;
const TAG_TEXT: u8 = 9;

// =============================================================================
// Decoding
// =============================================================================

/// Decode one event payload (without the length prefix).
pub fn decode_event(payload: &[u8]) -> Result<SourceEvent> {
    let mut cursor = Cursor::new(payload);

    let kind_byte = cursor.read_u8()?;
    let kind =
        EventKind::from_u8(kind_byte).ok_or(ProtocolError::UnknownEventKind(kind_byte))?;

    let event = match kind {
        EventKind::FlushAll => SourceEvent::FlushAll,
        EventKind::FlushTable => {
            let table = cursor.read_name().map_err(|e| match e {
                ProtocolError::InvalidFieldName => ProtocolError::InvalidTableName,
                other => other,
            })?;
            SourceEvent::FlushTable { table }
        }
        EventKind::Record => {
            let table = cursor.read_name().map_err(|e| match e {
                ProtocolError::InvalidFieldName => ProtocolError::InvalidTableName,
                other => other,
            })?;
            let count = cursor.read_u16()? as usize;
            let mut fields = Vec::with_capacity(count);
            for _ in 0..count {
                fields.push(cursor.read_field()?);
            }
            SourceEvent::Record {
                table,
                record: Record::new(fields),
            }
        }
    };

    if cursor.remaining() > 0 {
        return Err(ProtocolError::TrailingBytes(cursor.remaining()));
    }

    Ok(event)
}

/// Bounds-checked reader over an event payload
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ProtocolError::too_short(self.pos + n, self.buf.len()));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a u16-prefixed UTF-8 name
    fn read_name(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidFieldName)
    }

    /// Read one field: name, type tag, length-prefixed value
    fn read_field(&mut self) -> Result<Field> {
        let name = self.read_name()?;
        let tag = self.read_u8()?;
        let len = self.read_u32()? as usize;
        let raw = self.take(len)?;

        let value = match tag {
            TAG_INT => FieldValue::Int(i64::from_be_bytes(fixed(&name, "int", raw)?)),
            TAG_COUNT => FieldValue::Count(u64::from_be_bytes(fixed(&name, "count", raw)?)),
            TAG_BOOL => {
                let b: [u8; 1] = fixed(&name, "bool", raw)?;
                FieldValue::Bool(b[0] != 0)
            }
            TAG_DOUBLE | TAG_TIME | TAG_INTERVAL => {
                FieldValue::Double(f64::from_be_bytes(fixed(&name, "double", raw)?))
            }
            TAG_PORT => {
                let b: [u8; 3] = fixed(&name, "port", raw)?;
                FieldValue::Port {
                    number: u16::from_be_bytes([b[0], b[1]]),
                    proto: Transport::from_u8(b[2]),
                }
            }
            TAG_ADDR => {
                let b: [u8; 4] = fixed(&name, "addr", raw)?;
                FieldValue::Addr(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
            }
            TAG_TEXT => FieldValue::Text(Bytes::copy_from_slice(raw)),
            // Unknown tag: keep the tag, drop the value. The encoder renders
            // this as the NULL token with a diagnostic.
            other => FieldValue::Unsupported(other),
        };

        Ok(Field { name, value })
    }
}

/// Interpret a length-prefixed value as a fixed-width array
fn fixed<const N: usize>(field: &str, kind: &'static str, raw: &[u8]) -> Result<[u8; N]> {
    raw.try_into()
        .map_err(|_| ProtocolError::invalid_value(field, kind, raw.len()))
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode one event payload (without the length prefix).
pub fn encode_event(event: &SourceEvent) -> Bytes {
    let mut buf = BytesMut::new();

    match event {
        SourceEvent::FlushAll => {
            buf.put_u8(EventKind::FlushAll as u8);
        }
        SourceEvent::FlushTable { table } => {
            buf.put_u8(EventKind::FlushTable as u8);
            put_name(&mut buf, table);
        }
        SourceEvent::Record { table, record } => {
            buf.put_u8(EventKind::Record as u8);
            put_name(&mut buf, table);
            buf.put_u16(record.len() as u16);
            for field in record.fields() {
                put_name(&mut buf, &field.name);
                put_value(&mut buf, &field.value);
            }
        }
    }

    buf.freeze()
}

/// Encode one event as a complete length-prefixed frame.
pub fn encode_frame(event: &SourceEvent) -> Bytes {
    let payload = encode_event(event);
    let mut buf = BytesMut::with_capacity(crate::LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32(payload.len() as u32);
    buf.put_slice(&payload);
    buf.freeze()
}

fn put_name(buf: &mut BytesMut, name: &str) {
    buf.put_u16(name.len() as u16);
    buf.put_slice(name.as_bytes());
}

fn put_value(buf: &mut BytesMut, value: &FieldValue) {
    match value {
        FieldValue::Int(v) => {
            buf.put_u8(TAG_INT);
            buf.put_u32(8);
            buf.put_i64(*v);
        }
        FieldValue::Count(v) => {
            buf.put_u8(TAG_COUNT);
            buf.put_u32(8);
            buf.put_u64(*v);
        }
        FieldValue::Bool(v) => {
            buf.put_u8(TAG_BOOL);
            buf.put_u32(1);
            buf.put_u8(*v as u8);
        }
        FieldValue::Double(v) => {
            buf.put_u8(TAG_DOUBLE);
            buf.put_u32(8);
            buf.put_f64(*v);
        }
        FieldValue::Port { number, proto } => {
            buf.put_u8(TAG_PORT);
            buf.put_u32(3);
            buf.put_u16(*number);
            buf.put_u8(*proto as u8);
        }
        FieldValue::Addr(addr) => {
            buf.put_u8(TAG_ADDR);
            buf.put_u32(4);
            buf.put_slice(&addr.octets());
        }
        FieldValue::Text(bytes) => {
            buf.put_u8(TAG_TEXT);
            buf.put_u32(bytes.len() as u32);
            buf.put_slice(bytes);
        }
        FieldValue::Unsupported(tag) => {
            buf.put_u8(*tag);
            buf.put_u32(0);
        }
    }
}
