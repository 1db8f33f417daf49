//! Text-format row encoding for COPY FROM STDIN.
//!
//! Rows are tab-separated, newline-terminated, one per record. Text fields
//! pass through the byte sanitizer first, then have any remaining tab or
//! newline bytes removed so they can never split a column or a row.

use bytes::Bytes;
use tracing::warn;

use dblog_protocol::{FieldValue, Record};

use super::sanitize;

/// Column value emitted when a field cannot be rendered.
pub const NULL_TOKEN: &str = "\\N";

/// Build the streaming bulk-load statement for a table.
///
/// The column list comes from the first record seen for the table and is
/// fixed for the life of the session.
pub fn copy_statement(table: &str, record: &Record) -> String {
    format!("COPY {} ({}) FROM STDIN", table, record.column_list())
}

/// Encode one record as a COPY text row.
///
/// Encoding never fails: a value kind with no rendering degrades to the
/// NULL token, with a warning naming the field.
pub fn encode_record(table: &str, record: &Record) -> Bytes {
    let mut row = Vec::with_capacity(64);
    for (i, field) in record.fields().enumerate() {
        if i > 0 {
            row.push(b'\t');
        }
        encode_value(table, &field.name, &field.value, &mut row);
    }
    row.push(b'\n');
    Bytes::from(row)
}

fn encode_value(table: &str, name: &str, value: &FieldValue, out: &mut Vec<u8>) {
    match value {
        FieldValue::Int(v) => out.extend_from_slice(v.to_string().as_bytes()),
        FieldValue::Count(v) => out.extend_from_slice(v.to_string().as_bytes()),
        FieldValue::Bool(v) => out.extend_from_slice(if *v { b"true" } else { b"false" }),
        FieldValue::Double(v) => out.extend_from_slice(format!("{:.6}", v).as_bytes()),
        FieldValue::Port { number, .. } => out.extend_from_slice(number.to_string().as_bytes()),
        FieldValue::Addr(v) => out.extend_from_slice(v.to_string().as_bytes()),
        FieldValue::Text(bytes) => encode_text(bytes, out),
        FieldValue::Unsupported(tag) => {
            warn!(table, field = name, tag, "unsupported field type, writing NULL");
            out.extend_from_slice(NULL_TOKEN.as_bytes());
        }
    }
}

/// Sanitize text bytes, then strip any tab or newline the sanitizer let
/// through. Stripping after escaping keeps backslash sequences intact.
fn encode_text(bytes: &[u8], out: &mut Vec<u8>) {
    let escaped = sanitize::escape(bytes);
    out.extend(escaped.into_iter().filter(|b| *b != b'\t' && *b != b'\n'));
}
