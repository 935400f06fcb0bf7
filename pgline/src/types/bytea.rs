//! `bytea`, variable length binary string.
//!
//! <https://www.postgresql.org/docs/current/datatype-binary.html>
use bytes::Buf;
use std::fmt::Write;

use super::{
    ByteaOutput, DecodeError, EncodeError, HostType, Value,
    codec::{codec, get_length, put_framed},
};

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

codec! {
    /// `bytea` codec.
    pub struct Bytea: Binary => Bytes;

    fn text_decode(_, text, _) {
        decode_text(text).map(|e|Value::Bytes(e.into()))
    }

    fn text_encode(_, value, out, cx) {
        let Value::Bytes(bytes) = value else {
            return Err(mismatch(value));
        };
        match cx.settings().bytea_output {
            ByteaOutput::Hex => encode_hex(bytes, out),
            ByteaOutput::Escape => encode_escape(bytes, out),
        }
        Ok(())
    }

    fn binary_decode(_, buf, cx) {
        let Some(len) = get_length(buf)? else {
            return Ok(Value::Null);
        };
        let retain = match cx.settings().field_length_max {
            Some(max) => len.min(max as usize),
            None => len,
        };
        let value = buf.split_to(retain);
        buf.advance(len - retain);
        Ok(Value::Bytes(value))
    }

    fn binary_encode(_, value, buf, _) {
        let Value::Bytes(bytes) = value else {
            return Err(mismatch(value));
        };
        put_framed(buf, bytes)
    }
}

fn mismatch(value: &Value) -> EncodeError {
    EncodeError::TypeMismatch { expected: HostType::Bytes, found: value.host_type() }
}

/// Decode either text format.
///
/// `\x` (or a quoted `'x`) prefix is hex format, anything else is escape
/// format.
pub(crate) fn decode_text(text: &str) -> Result<Vec<u8>, DecodeError> {
    match text.as_bytes() {
        [b'\\' | b'\'', b'x', hex @ ..] => decode_hex(hex, 2),
        escaped => decode_escape(escaped),
    }
}

pub(crate) fn encode_hex(bytes: &[u8], out: &mut String) {
    out.reserve(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push(HEX_UPPER[(b >> 4) as usize] as char);
        out.push(HEX_UPPER[(b & 0xf) as usize] as char);
    }
}

/// Printable ascii is kept, backslash is doubled, everything else is a
/// three digit octal escape.
pub(crate) fn encode_escape(bytes: &[u8], out: &mut String) {
    out.reserve(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            },
        }
    }
}

/// `offset` is the position of `hex` in the original text, for error reporting.
fn decode_hex(hex: &[u8], offset: usize) -> Result<Vec<u8>, DecodeError> {
    if hex.len() % 2 != 0 {
        return Err(DecodeError::InvalidHex(offset + hex.len()));
    }
    let mut out = Vec::with_capacity(hex.len() / 2);
    for (i, pair) in hex.chunks_exact(2).enumerate() {
        let at = offset + i * 2;
        let hi = hex_digit(pair[0]).ok_or(DecodeError::InvalidHex(at))?;
        let lo = hex_digit(pair[1]).ok_or(DecodeError::InvalidHex(at + 1))?;
        out.push(hi << 4 | lo);
    }
    Ok(out)
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Escape decoder state.
#[derive(Clone, Copy)]
enum Escape {
    /// Copy the next byte through.
    Literal,
    /// After a backslash, expecting another backslash or the first octal digit.
    Backslash,
    /// Inside an octal escape, `digits` already read.
    Octal { value: u16, digits: u8 },
}

/// Decode legacy escape format.
///
/// The scan index advances by exactly one input byte per step and the output
/// grows by exactly one byte per completed unit: a literal byte, `\\`, or
/// `\ooo`.
fn decode_escape(text: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(text.len());
    let mut state = Escape::Literal;
    // start of the current escape sequence, for error reporting
    let mut start = 0;

    for (i, &b) in text.iter().enumerate() {
        state = match (state, b) {
            (Escape::Literal, b'\\') => {
                start = i;
                Escape::Backslash
            },
            (Escape::Literal, b) => {
                out.push(b);
                Escape::Literal
            },
            (Escape::Backslash, b'\\') => {
                out.push(b'\\');
                Escape::Literal
            },
            (Escape::Backslash, b'0'..=b'7') => Escape::Octal { value: (b - b'0') as u16, digits: 1 },
            (Escape::Octal { value, digits }, b'0'..=b'7') => {
                let value = value << 3 | (b - b'0') as u16;
                match digits + 1 {
                    3 => {
                        let Ok(byte) = u8::try_from(value) else {
                            return Err(DecodeError::InvalidEscape(start));
                        };
                        out.push(byte);
                        Escape::Literal
                    },
                    digits => Escape::Octal { value, digits },
                }
            },
            (Escape::Backslash | Escape::Octal { .. }, _) => return Err(DecodeError::InvalidEscape(start)),
        };
    }

    match state {
        Escape::Literal => Ok(out),
        _ => Err(DecodeError::InvalidEscape(start)),
    }
}

#[cfg(test)]
mod test {
    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::{
        postgres::oid,
        types::{BinaryDecoder, BinaryEncoder, Context, Registry, SessionContext, Settings, TextDecoder, TextEncoder, Type, PrimitiveType},
    };
    use std::sync::Arc;

    const TY: Type = Type::new(oid::BYTEA, "bytea", PrimitiveType::Binary);

    fn cx_with(settings: Settings) -> SessionContext {
        SessionContext::new(Arc::new(Registry::standard()), settings)
    }

    fn text_round_trip(bytes: &[u8], output: ByteaOutput) -> Value {
        let cx = cx_with(Settings { bytea_output: output, ..Default::default() });
        let mut text = String::new();
        TextEncoder::encode(&Bytea, &TY, &Value::from(bytes), &mut text, &cx).unwrap();
        TextDecoder::decode(&Bytea, &TY, &text, &cx).unwrap()
    }

    #[test]
    fn hex_text() {
        let cx = SessionContext::default();
        let mut text = String::new();
        TextEncoder::encode(&Bytea, &TY, &Value::from(&b"Hello"[..]), &mut text, &cx).unwrap();
        assert_eq!(text, "\\x48656C6C6F");

        let value = TextDecoder::decode(&Bytea, &TY, "\\x48656C6C6F", &cx).unwrap();
        assert_eq!(value, Value::from(&b"Hello"[..]));

        let value = TextDecoder::decode(&Bytea, &TY, "'x48656c6c6f", &cx).unwrap();
        assert_eq!(value, Value::from(&b"Hello"[..]));
    }

    #[test]
    fn hex_uppercase_digits() {
        let mut text = String::new();
        encode_hex(&[0xde, 0xad, 0x0b], &mut text);
        assert_eq!(text, "\\xDEAD0B");
    }

    #[test]
    fn malformed_hex() {
        assert!(matches!(decode_text("\\x4"), Err(DecodeError::InvalidHex(3))));
        assert!(matches!(decode_text("\\x4G"), Err(DecodeError::InvalidHex(3))));
    }

    #[test]
    fn escape_decode() {
        assert_eq!(decode_text("abc").unwrap(), b"abc");
        assert_eq!(decode_text("a\\\\b").unwrap(), b"a\\b");
        assert_eq!(decode_text("\\000\\001\\377").unwrap(), [0, 1, 255]);
        assert_eq!(decode_text("x\\101y").unwrap(), b"xAy");
        assert_eq!(decode_text("").unwrap(), b"");
    }

    #[test]
    fn malformed_escape() {
        // not an octal digit, out of range, and truncated sequences
        assert!(matches!(decode_text("ab\\9"), Err(DecodeError::InvalidEscape(2))));
        assert!(matches!(decode_text("\\400"), Err(DecodeError::InvalidEscape(0))));
        assert!(matches!(decode_text("a\\12"), Err(DecodeError::InvalidEscape(1))));
        assert!(matches!(decode_text("a\\"), Err(DecodeError::InvalidEscape(1))));
    }

    #[test]
    fn text_round_trip_both_formats() {
        let all: Vec<u8> = (0..=255).collect();
        for sample in [&b""[..], &b"Hello"[..], &b"\\"[..], &b"\\x41"[..], &all[..]] {
            assert_eq!(text_round_trip(sample, ByteaOutput::Hex), Value::from(sample));
            assert_eq!(text_round_trip(sample, ByteaOutput::Escape), Value::from(sample));
        }
    }

    #[test]
    fn escape_encode() {
        let mut text = String::new();
        encode_escape(b"a\\\0\x7f", &mut text);
        assert_eq!(text, "a\\\\\\000\\177");
    }

    #[test]
    fn binary_null() {
        let cx = SessionContext::default();
        let mut buf = BytesMut::new();
        BinaryEncoder::encode(&Bytea, &TY, &Value::Null, &mut buf, &cx).unwrap();
        assert_eq!(&buf[..], &[0xff, 0xff, 0xff, 0xff]);

        let value = BinaryDecoder::decode(&Bytea, &TY, &mut buf.freeze(), &cx).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn binary_empty_is_not_null() {
        let cx = SessionContext::default();
        let mut buf = BytesMut::new();
        BinaryEncoder::encode(&Bytea, &TY, &Value::from(&b""[..]), &mut buf, &cx).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 0]);

        let value = BinaryDecoder::decode(&Bytea, &TY, &mut buf.freeze(), &cx).unwrap();
        assert_eq!(value, Value::Bytes(Bytes::new()));
    }

    #[test]
    fn binary_round_trip() {
        let cx = SessionContext::default();
        let mut buf = BytesMut::new();
        BinaryEncoder::encode(&Bytea, &TY, &Value::from(&b"\0\x01raw"[..]), &mut buf, &cx).unwrap();
        assert_eq!(&buf[..4], &[0, 0, 0, 5]);

        let mut buf = buf.freeze();
        let value = BinaryDecoder::decode(&Bytea, &TY, &mut buf, &cx).unwrap();
        assert_eq!(value, Value::from(&b"\0\x01raw"[..]));
        assert!(buf.is_empty());
    }

    #[test]
    fn truncation_consumes_declared_length() {
        let cx = cx_with(Settings { field_length_max: Some(3), ..Default::default() });
        assert_eq!(cx.settings().field_length_max, Some(3));

        let mut buf = Bytes::from_static(b"\0\0\0\x05Hello\0\0\0\x01!");
        let value = BinaryDecoder::decode(&Bytea, &TY, &mut buf, &cx).unwrap();
        assert_eq!(value, Value::from(&b"Hel"[..]));

        // next value starts right after the skipped bytes
        let value = BinaryDecoder::decode(&Bytea, &TY, &mut buf, &cx).unwrap();
        assert_eq!(value, Value::from(&b"!"[..]));
    }

    #[test]
    fn declared_length_larger_than_input() {
        let cx = SessionContext::default();
        let mut buf = Bytes::from_static(b"\x7f\xff\xff\xffabc");
        let err = BinaryDecoder::decode(&Bytea, &TY, &mut buf, &cx).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { .. }));
    }
}
