//! `float4` and `float8`.
use bytes::BufMut;
use std::fmt::Write;

use super::{
    DecodeError, EncodeError, HostType, Value,
    codec::{codec, get_fixed},
};

fn parse(text: &str) -> Result<f64, DecodeError> {
    // rust also accepts `inf`, `infinity` and `nan` case insensitively
    text.trim()
        .parse()
        .map_err(|_|DecodeError::InvalidText(format!("invalid float: {text:?}").into()))
}

fn format(value: f64, out: &mut String) {
    if value.is_nan() {
        out.push_str("NaN");
    } else if value.is_infinite() {
        out.push_str(if value.is_sign_negative() { "-Infinity" } else { "Infinity" });
    } else {
        let _ = write!(out, "{value}");
    }
}

codec! {
    /// `float4` codec.
    pub struct Float4: Float => Float32;

    fn text_decode(_, text, _) {
        Ok(Value::Float32(parse(text)? as f32))
    }

    fn text_encode(_, value, out, _) {
        match value {
            Value::Float32(v) => format(*v as f64, out),
            value => return Err(mismatch(HostType::Float32, value)),
        }
        Ok(())
    }

    fn binary_decode(_, buf, _) {
        match get_fixed::<4>(buf)? {
            Some(be) => Ok(Value::Float32(f32::from_be_bytes(be))),
            None => Ok(Value::Null),
        }
    }

    fn binary_encode(_, value, buf, _) {
        let Value::Float32(v) = value else {
            return Err(mismatch(HostType::Float32, value));
        };
        buf.put_i32(4);
        buf.put_f32(*v);
        Ok(())
    }
}

codec! {
    /// `float8` codec.
    pub struct Float8: Double => Float64;

    fn text_decode(_, text, _) {
        parse(text).map(Value::Float64)
    }

    fn text_encode(_, value, out, _) {
        format(as_f64(value)?, out);
        Ok(())
    }

    fn binary_decode(_, buf, _) {
        match get_fixed::<8>(buf)? {
            Some(be) => Ok(Value::Float64(f64::from_be_bytes(be))),
            None => Ok(Value::Null),
        }
    }

    fn binary_encode(_, value, buf, _) {
        let value = as_f64(value)?;
        buf.put_i32(8);
        buf.put_f64(value);
        Ok(())
    }
}

fn as_f64(value: &Value) -> Result<f64, EncodeError> {
    match *value {
        Value::Float32(v) => Ok(v as f64),
        Value::Float64(v) => Ok(v),
        ref value => Err(mismatch(HostType::Float64, value)),
    }
}

fn mismatch(expected: HostType, value: &Value) -> EncodeError {
    EncodeError::TypeMismatch { expected, found: value.host_type() }
}
