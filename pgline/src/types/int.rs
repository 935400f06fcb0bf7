//! `int2`, `int4` and `int8`.
use bytes::BufMut;

use super::{
    DecodeError, EncodeError, HostType, Value,
    codec::{codec, get_fixed},
};

/// Accept any integer host value that fits in `T`.
fn integer<T>(value: &Value, expected: HostType) -> Result<T, EncodeError>
where
    T: TryFrom<i64>,
{
    let wide = match *value {
        Value::Int16(v) => v as i64,
        Value::Int32(v) => v as i64,
        Value::Int64(v) => v,
        ref value => return Err(EncodeError::TypeMismatch { expected, found: value.host_type() }),
    };
    T::try_from(wide).map_err(|_|EncodeError::OutOfRange)
}

fn parse<T: std::str::FromStr>(text: &str) -> Result<T, DecodeError> {
    text.trim()
        .parse()
        .map_err(|_|DecodeError::InvalidText(format!("invalid integer: {text:?}").into()))
}

macro_rules! int {
    ($($name:ident, $ty:ty, $prim:ident, $host:ident, $put:ident, $doc:literal;)*) => {$(
        codec! {
            #[doc = $doc]
            pub struct $name: $prim => $host;

            fn text_decode(_, text, _) {
                parse::<$ty>(text).map(Value::$host)
            }

            fn text_encode(_, value, out, _) {
                let value = integer::<$ty>(value, HostType::$host)?;
                out.push_str(itoa::Buffer::new().format(value));
                Ok(())
            }

            fn binary_decode(_, buf, _) {
                match get_fixed::<{ size_of::<$ty>() }>(buf)? {
                    Some(be) => Ok(Value::$host(<$ty>::from_be_bytes(be))),
                    None => Ok(Value::Null),
                }
            }

            fn binary_encode(_, value, buf, _) {
                let value = integer::<$ty>(value, HostType::$host)?;
                buf.put_i32(size_of::<$ty>() as i32);
                buf.$put(value);
                Ok(())
            }
        }
    )*};
}

int! {
    Int2, i16, Int2, Int16, put_i16, "`int2` codec.";
    Int4, i32, Int4, Int32, put_i32, "`int4` codec.";
    Int8, i64, Int8, Int64, put_i64, "`int8` codec.";
}

#[cfg(test)]
mod test {
    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::types::{BinaryDecoder, BinaryEncoder, PrimitiveType, SessionContext, TextDecoder, TextEncoder, Type};

    const INT2: Type = Type::new(21, "int2", PrimitiveType::Int2);
    const INT8: Type = Type::new(20, "int8", PrimitiveType::Int8);

    #[test]
    fn narrowing_is_range_checked() {
        let cx = SessionContext::default();
        let mut buf = BytesMut::new();
        BinaryEncoder::encode(&Int2, &INT2, &Value::Int64(-2), &mut buf, &cx).unwrap();
        assert_eq!(&buf[..], &[0, 0, 0, 2, 0xff, 0xfe]);

        let err = BinaryEncoder::encode(&Int2, &INT2, &Value::Int32(70_000), &mut buf, &cx);
        assert!(matches!(err, Err(EncodeError::OutOfRange)));

        let err = BinaryEncoder::encode(&Int2, &INT2, &Value::from("1"), &mut buf, &cx);
        assert!(matches!(err, Err(EncodeError::TypeMismatch { expected: HostType::Int16, .. })));
    }

    #[test]
    fn widening() {
        let cx = SessionContext::default();
        let mut buf = BytesMut::new();
        BinaryEncoder::encode(&Int8, &INT8, &Value::Int16(5), &mut buf, &cx).unwrap();
        let value = BinaryDecoder::decode(&Int8, &INT8, &mut buf.freeze(), &cx).unwrap();
        assert_eq!(value, Value::Int64(5));
    }

    #[test]
    fn text() {
        let cx = SessionContext::default();
        assert_eq!(TextDecoder::decode(&Int8, &INT8, "-9001", &cx).unwrap(), Value::Int64(-9001));
        assert!(TextDecoder::decode(&Int2, &INT2, "99999", &cx).is_err());

        let mut out = String::new();
        TextEncoder::encode(&Int8, &INT8, &Value::Int32(42), &mut out, &cx).unwrap();
        assert_eq!(out, "42");
    }

    #[test]
    fn binary_wrong_width() {
        let cx = SessionContext::default();
        let mut buf = Bytes::from_static(&[0, 0, 0, 4, 0, 0, 0, 1]);
        assert!(matches!(
            BinaryDecoder::decode(&Int2, &INT2, &mut buf, &cx),
            Err(DecodeError::InvalidLength { expected: Some(2), found: 4 })
        ));
    }
}
