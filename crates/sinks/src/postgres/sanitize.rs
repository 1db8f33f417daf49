//! Byte sanitization for COPY text rows
//!
//! Two concerns live here:
//!
//! 1. UTF-8 well-formedness checking, done with a fixed octet-classification
//!    table and an 8-state transition machine over the grammar in RFC 3629 /
//!    Unicode "Table 3-7. Well-Formed UTF-8 Byte Sequences". Overlong
//!    encodings and surrogate code points are rejected.
//!
//! 2. Escaping arbitrary field bytes into a printable representation that is
//!    safe inside a tab/newline-delimited text row. Validated multi-byte
//!    UTF-8 sequences pass through verbatim; everything else non-printable
//!    gets an escape. Tab and newline are deliberately NOT handled here:
//!    they are the row's own delimiters, and the row encoder strips them
//!    from text fields.
//!
//! Escaped output never exceeds 5 bytes per input byte; `escape` reserves
//! accordingly.

// Octet categories over the UTF-8 grammar:
//
//   UTF8-1  = %x00-7F
//   UTF8-2  = %xC2-DF tail
//   UTF8-3  = %xE0 %xA0-BF tail / %xE1-EC 2(tail) /
//             %xED %x80-9F tail / %xEE-EF 2(tail)
//   UTF8-4  = %xF0 %x90-BF 2(tail) / %xF1-F3 3(tail) / %xF4 %x80-8F 2(tail)
//   tail    = %x80-BF
const fn category_of(octet: u8) -> u8 {
    match octet {
        0x00..=0x7F => 0,
        0x80..=0x8F => 1,
        0x90..=0x9F => 2,
        0xA0..=0xBF => 3,
        0xC0..=0xC1 => 4,
        0xC2..=0xDF => 5,
        0xE0 => 6,
        0xE1..=0xEC => 7,
        0xED => 8,
        0xEE..=0xEF => 9,
        0xF0 => 10,
        0xF1..=0xF3 => 11,
        0xF4 => 12,
        0xF5..=0xFF => 13,
    }
}

/// Lookup table categorizing each octet
const OCTET_CATEGORY: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = category_of(i as u8);
        i += 1;
    }
    table
};

// Machine states, named for the tail bytes still expected
const S_START: u8 = 0;
const S_80BF: u8 = 1;
const S_A0BF: u8 = 2;
const S_80BF_80BF: u8 = 3;
const S_80_9F: u8 = 4;
const S_90BF: u8 = 5;
const S_80BF_80BF_80BF: u8 = 6;
const S_80_8F: u8 = 7;
const S_ERROR: u8 = 8;

const E: u8 = S_ERROR;

/// Machine transition table, indexed by [state][octet category]
#[rustfmt::skip]
const MACHINE: [[u8; 14]; 9] = [
    // cat:      ascii 80-8f      90-9f      a0-bf      c0-c1 c2-df  e0     e1-ec       ed      ee-ef       f0     f1-f3            f4      f5-ff
    /* START */ [S_START, E,        E,         E,           E, S_80BF, S_A0BF, S_80BF_80BF, S_80_9F, S_80BF_80BF, S_90BF, S_80BF_80BF_80BF, S_80_8F, E],
    /* 80BF  */ [E, S_START,        S_START,   S_START,     E, E,      E,      E,           E,       E,           E,      E,                E,       E],
    /* A0BF  */ [E, E,              E,         S_80BF,      E, E,      E,      E,           E,       E,           E,      E,                E,       E],
    /* 2x    */ [E, S_80BF,         S_80BF,    S_80BF,      E, E,      E,      E,           E,       E,           E,      E,                E,       E],
    /* 809F  */ [E, S_80BF,         S_80BF,    E,           E, E,      E,      E,           E,       E,           E,      E,                E,       E],
    /* 90BF  */ [E, E,              S_80BF_80BF, S_80BF_80BF, E, E,    E,      E,           E,       E,           E,      E,                E,       E],
    /* 3x    */ [E, S_80BF_80BF,    S_80BF_80BF, S_80BF_80BF, E, E,    E,      E,           E,       E,           E,      E,                E,       E],
    /* 808F  */ [E, S_80BF_80BF,    E,         E,           E, E,      E,      E,           E,       E,           E,      E,                E,       E],
    /* ERROR */ [E, E,              E,         E,           E, E,      E,      E,           E,       E,           E,      E,                E,       E],
];

#[inline]
fn step(state: u8, octet: u8) -> u8 {
    MACHINE[state as usize][OCTET_CATEGORY[octet as usize] as usize]
}

/// Whether `data` is well-formed UTF-8.
///
/// Feeding the whole sequence and ending back in the start state means every
/// character completed; a dangling lead byte or a bad tail leaves the machine
/// mid-sequence or in the error state.
pub fn is_valid_utf8(data: &[u8]) -> bool {
    let mut state = S_START;
    for &octet in data {
        state = step(state, octet);
    }
    state == S_START
}

/// Length of the longest prefix of `data` made of completed, well-formed
/// characters.
///
/// Used to avoid splitting a multi-byte sequence when only a length-bounded
/// window of a larger buffer is available.
pub fn last_valid_utf8(data: &[u8]) -> usize {
    let mut state = S_START;
    let mut boundary = 0;
    for (i, &octet) in data.iter().enumerate() {
        state = step(state, octet);
        if state == S_START {
            boundary = i + 1;
        }
    }
    boundary
}

/// If `data` starts a complete well-formed multi-byte sequence, its length.
fn sequence_len(data: &[u8]) -> Option<usize> {
    let mut state = S_START;
    for (i, &octet) in data.iter().take(4).enumerate() {
        state = step(state, octet);
        if state == S_ERROR {
            return None;
        }
        if state == S_START {
            return Some(i + 1);
        }
    }
    None
}

/// Escape `data` into `out`.
///
/// - NUL: `\0`
/// - control bytes 0x01-0x1A: caret mnemonic (`^A` .. `^Z`), except tab and
///   newline which pass through untouched (callers strip them)
/// - DEL: `^?`
/// - backslash: doubled
/// - bytes above 0x7E: `\xHH`, unless they form a validated multi-byte UTF-8
///   sequence, which is copied through verbatim
pub fn escape_into(data: &[u8], out: &mut Vec<u8>) {
    out.reserve(data.len());

    let mut i = 0;
    while i < data.len() {
        let octet = data[i];
        match octet {
            0x00 => out.extend_from_slice(b"\\0"),
            b'\t' | b'\n' => out.push(octet),
            0x01..=0x1A => {
                out.push(b'^');
                out.push(b'A' + octet - 1);
            }
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x7F => out.extend_from_slice(b"^?"),
            0x1B..=0x7E => out.push(octet),
            0x80..=0xFF => {
                if let Some(len) = sequence_len(&data[i..]) {
                    out.extend_from_slice(&data[i..i + len]);
                    i += len;
                    continue;
                }
                let mut hex = [0u8; 4];
                hex[0] = b'\\';
                hex[1] = b'x';
                hex[2] = HEX[(octet >> 4) as usize];
                hex[3] = HEX[(octet & 0x0F) as usize];
                out.extend_from_slice(&hex);
            }
        }
        i += 1;
    }
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// Escape `data` into a fresh buffer.
pub fn escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 4);
    escape_into(data, &mut out);
    out
}
