//! Tests for COPY text row encoding

use std::net::Ipv4Addr;

use bytes::Bytes;

use dblog_protocol::{Field, FieldValue, Record, Transport};

use super::encode::{copy_statement, encode_record};

fn text(value: &str) -> FieldValue {
    FieldValue::Text(Bytes::from(value.to_string()))
}

fn encode(record: &Record) -> Vec<u8> {
    encode_record("t", record).to_vec()
}

#[test]
fn test_copy_statement_lists_columns_in_order() {
    let record = Record::new(vec![
        Field::new("id", FieldValue::Int(1)),
        Field::new("host", text("h")),
        Field::new("note", text("n")),
    ]);
    assert_eq!(
        copy_statement("conn_log", &record),
        "COPY conn_log (id, host, note) FROM STDIN"
    );
}

#[test]
fn test_row_is_tab_separated_and_newline_terminated() {
    let record = Record::new(vec![
        Field::new("id", FieldValue::Int(42)),
        Field::new("host", text("example.com")),
        Field::new("note", text("all good")),
    ]);
    assert_eq!(encode(&record), b"42\texample.com\tall good\n".to_vec());
}

#[test]
fn test_scalar_renderings() {
    assert_eq!(
        encode(&Record::new(vec![Field::new("v", FieldValue::Int(-7))])),
        b"-7\n".to_vec()
    );
    assert_eq!(
        encode(&Record::new(vec![Field::new(
            "v",
            FieldValue::Count(u64::MAX)
        )])),
        format!("{}\n", u64::MAX).into_bytes()
    );
    assert_eq!(
        encode(&Record::new(vec![Field::new("v", FieldValue::Bool(true))])),
        b"true\n".to_vec()
    );
    assert_eq!(
        encode(&Record::new(vec![Field::new("v", FieldValue::Bool(false))])),
        b"false\n".to_vec()
    );
}

#[test]
fn test_double_renders_fixed_six_places() {
    assert_eq!(
        encode(&Record::new(vec![Field::new(
            "v",
            FieldValue::Double(1.5)
        )])),
        b"1.500000\n".to_vec()
    );
    assert_eq!(
        encode(&Record::new(vec![Field::new(
            "v",
            FieldValue::Double(1234567890.25)
        )])),
        b"1234567890.250000\n".to_vec()
    );
}

#[test]
fn test_port_renders_number_only() {
    let record = Record::new(vec![Field::new(
        "p",
        FieldValue::Port {
            number: 443,
            proto: Transport::Tcp,
        },
    )]);
    assert_eq!(encode(&record), b"443\n".to_vec());
}

#[test]
fn test_addr_renders_dotted_quad() {
    let record = Record::new(vec![Field::new(
        "a",
        FieldValue::Addr(Ipv4Addr::new(10, 0, 0, 12)),
    )]);
    assert_eq!(encode(&record), b"10.0.0.12\n".to_vec());
}

#[test]
fn test_unsupported_kind_degrades_to_null() {
    let record = Record::new(vec![
        Field::new("v", FieldValue::Unsupported(42)),
        Field::new("w", FieldValue::Int(1)),
    ]);
    assert_eq!(encode(&record), b"\\N\t1\n".to_vec());
}

#[test]
fn test_text_backslash_escaped() {
    let record = Record::new(vec![Field::new("v", text("a\\b"))]);
    assert_eq!(encode(&record), b"a\\\\b\n".to_vec());
}

#[test]
fn test_text_tabs_and_newlines_removed() {
    let record = Record::new(vec![
        Field::new("v", text("col\tумn\nbreak")),
        Field::new("w", FieldValue::Int(2)),
    ]);
    assert_eq!(encode(&record), "colумnbreak\t2\n".as_bytes().to_vec());
}

#[test]
fn test_text_control_bytes_escaped() {
    let record = Record::new(vec![Field::new(
        "v",
        FieldValue::Text(Bytes::from_static(&[b'a', 0x00, 0x01, 0x7F, b'z'])),
    )]);
    assert_eq!(encode(&record), b"a\\0^A^?z\n".to_vec());
}

#[test]
fn test_text_invalid_bytes_hex_escaped() {
    let record = Record::new(vec![Field::new(
        "v",
        FieldValue::Text(Bytes::from_static(&[0xFF, b'o', b'k'])),
    )]);
    assert_eq!(encode(&record), b"\\xFFok\n".to_vec());
}

#[test]
fn test_empty_record_is_bare_newline() {
    assert_eq!(encode(&Record::default()), b"\n".to_vec());
}
