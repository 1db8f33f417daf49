//! Field and record data model
//!
//! A `Record` is an ordered sequence of named, typed fields. Field order is
//! significant: the first record seen for a table fixes the column order and
//! names used for that table's load statement.

use bytes::Bytes;
use std::net::Ipv4Addr;

/// Transport-protocol qualifier on a port value.
///
/// Decoded and carried through, but not rendered by the row encoder; the
/// destination schemas store the bare port number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Transport {
    #[default]
    Unknown = 0,
    Tcp = 1,
    Udp = 2,
    Icmp = 3,
}

impl Transport {
    /// Parse from raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Tcp,
            2 => Self::Udp,
            3 => Self::Icmp,
            _ => Self::Unknown,
        }
    }

    /// Get string representation
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Icmp => "icmp",
        }
    }
}

/// One typed value from a record.
///
/// Time and interval values share the `Double` variant: all three render as
/// fixed-point decimal text.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Signed integer
    Int(i64),
    /// Unsigned counter
    Count(u64),
    /// Boolean
    Bool(bool),
    /// Floating point, time, or interval
    Double(f64),
    /// Network port with optional transport qualifier
    Port { number: u16, proto: Transport },
    /// IPv4 network address
    Addr(Ipv4Addr),
    /// Arbitrary text bytes (not required to be valid UTF-8)
    Text(Bytes),
    /// A type tag this version does not understand; carried through so the
    /// encoder can degrade it to the NULL token instead of dropping the record
    Unsupported(u8),
}

impl FieldValue {
    /// Name of the value's kind, for diagnostics
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Count(_) => "count",
            Self::Bool(_) => "bool",
            Self::Double(_) => "double",
            Self::Port { .. } => "port",
            Self::Addr(_) => "addr",
            Self::Text(_) => "text",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

/// A named field within a record
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name in the destination table
    pub name: String,
    /// The typed value
    pub value: FieldValue,
}

impl Field {
    /// Create a new field
    pub fn new(name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// An ordered sequence of named fields.
///
/// Immutable once decoded from the wire. The field set of the first record
/// for a table is authoritative; later records with a different shape are a
/// caller error and are not validated here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// Create a record from fields
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Comma-joined column names, in field order.
    ///
    /// Used once per table, to build the bulk-load statement.
    pub fn column_list(&self) -> String {
        let mut out = String::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&field.name);
        }
        out
    }
}

impl FromIterator<Field> for Record {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
