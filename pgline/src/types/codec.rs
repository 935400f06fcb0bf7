use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{Context, DecodeError, EncodeError, HostType, PrimitiveType, Type, Value};

/// Decode a value from its text representation.
///
/// Text values are never null on the wire, NULL is signaled out of band.
pub trait TextDecoder: Send + Sync {
    fn primitive_type(&self) -> PrimitiveType;

    fn host_type(&self) -> HostType;

    fn decode(&self, ty: &Type, text: &str, cx: &dyn Context) -> Result<Value, DecodeError>;
}

/// Encode a value into its text representation.
pub trait TextEncoder: Send + Sync {
    fn primitive_type(&self) -> PrimitiveType;

    fn host_type(&self) -> HostType;

    fn encode(&self, ty: &Type, value: &Value, out: &mut String, cx: &dyn Context) -> Result<(), EncodeError>;
}

/// Decode a value from its binary representation.
///
/// `buf` starts at the `Int32` length prefix of the value, the decoder
/// consumes the prefix and exactly the declared length, even when it retains
/// less. A length of `-1` decodes to [`Value::Null`].
pub trait BinaryDecoder: Send + Sync {
    fn primitive_type(&self) -> PrimitiveType;

    fn host_type(&self) -> HostType;

    fn decode(&self, ty: &Type, buf: &mut Bytes, cx: &dyn Context) -> Result<Value, DecodeError>;
}

/// Encode a value into its binary representation.
///
/// Writes the `Int32` length prefix followed by the value, [`Value::Null`]
/// writes only the `-1` length.
pub trait BinaryEncoder: Send + Sync {
    fn primitive_type(&self) -> PrimitiveType;

    fn host_type(&self) -> HostType;

    fn encode(&self, ty: &Type, value: &Value, buf: &mut BytesMut, cx: &dyn Context) -> Result<(), EncodeError>;
}

/// Registered codecs of a single type.
#[derive(Clone, Copy)]
pub struct Codec {
    pub ty: Type,
    pub text_encoder: &'static dyn TextEncoder,
    pub text_decoder: &'static dyn TextDecoder,
    pub binary_encoder: &'static dyn BinaryEncoder,
    pub binary_decoder: &'static dyn BinaryDecoder,
}

impl Codec {
    pub fn host_type(&self) -> HostType {
        self.binary_decoder.host_type()
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("ty", &self.ty)
            .field("host", &self.host_type())
            .finish()
    }
}

/// The `-1` length of a NULL binary value.
pub(crate) const NULL_LENGTH: i32 = -1;

/// Read the `Int32` length prefix.
///
/// Returns `None` for NULL. The declared length is checked against the
/// remaining input before anything is allocated.
pub(crate) fn get_length(buf: &mut Bytes) -> Result<Option<usize>, DecodeError> {
    if buf.remaining() < 4 {
        return Err(DecodeError::UnexpectedEof { expected: 4, remaining: buf.remaining() });
    }
    let len = match buf.get_i32() {
        NULL_LENGTH => return Ok(None),
        len if len < 0 => return Err(DecodeError::InvalidLength { expected: None, found: len }),
        len => len as usize,
    };
    if buf.remaining() < len {
        return Err(DecodeError::UnexpectedEof { expected: len, remaining: buf.remaining() });
    }
    Ok(Some(len))
}

/// Read a fixed size value, `N` must match the declared length.
pub(crate) fn get_fixed<const N: usize>(buf: &mut Bytes) -> Result<Option<[u8; N]>, DecodeError> {
    let Some(len) = get_length(buf)? else {
        return Ok(None);
    };
    if len != N {
        buf.advance(len);
        return Err(DecodeError::InvalidLength { expected: Some(N), found: len as i32 });
    }
    let mut value = [0u8; N];
    buf.copy_to_slice(&mut value);
    Ok(Some(value))
}

/// Write `value` with its `Int32` length prefix.
pub(crate) fn put_framed(buf: &mut BytesMut, value: &[u8]) -> Result<(), EncodeError> {
    let Ok(len) = i32::try_from(value.len()) else {
        return Err(EncodeError::TooLong(value.len()));
    };
    buf.reserve(4 + value.len());
    buf.put_i32(len);
    buf.put_slice(value);
    Ok(())
}

pub(crate) fn put_null(buf: &mut BytesMut) {
    buf.put_i32(NULL_LENGTH);
}

/// Declare a codec unit struct that implements all four codec traits.
///
/// The body supplies `text_decode`, `text_encode`, `binary_decode` and
/// `binary_encode`, with NULL handled before the value reaches them.
macro_rules! codec {
    (
        $(#[$doc:meta])*
        pub struct $name:ident: $prim:ident => $host:ident;

        fn text_decode($td_ty:pat, $td_text:pat, $td_cx:pat) $td_body:block
        fn text_encode($te_ty:pat, $te_value:pat, $te_out:pat, $te_cx:pat) $te_body:block
        fn binary_decode($bd_ty:pat, $bd_buf:pat, $bd_cx:pat) $bd_body:block
        fn binary_encode($be_ty:pat, $be_value:pat, $be_buf:pat, $be_cx:pat) $be_body:block
    ) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl $crate::types::TextDecoder for $name {
            fn primitive_type(&self) -> $crate::types::PrimitiveType {
                $crate::types::PrimitiveType::$prim
            }

            fn host_type(&self) -> $crate::types::HostType {
                $crate::types::HostType::$host
            }

            fn decode(
                &self,
                $td_ty: &$crate::types::Type,
                $td_text: &str,
                $td_cx: &dyn $crate::types::Context,
            ) -> Result<$crate::types::Value, $crate::types::DecodeError> $td_body
        }

        impl $crate::types::TextEncoder for $name {
            fn primitive_type(&self) -> $crate::types::PrimitiveType {
                $crate::types::PrimitiveType::$prim
            }

            fn host_type(&self) -> $crate::types::HostType {
                $crate::types::HostType::$host
            }

            fn encode(
                &self,
                $te_ty: &$crate::types::Type,
                value: &$crate::types::Value,
                $te_out: &mut String,
                $te_cx: &dyn $crate::types::Context,
            ) -> Result<(), $crate::types::EncodeError> {
                if value.is_null() {
                    return Err($crate::types::EncodeError::Null);
                }
                let $te_value = value;
                $te_body
            }
        }

        impl $crate::types::BinaryDecoder for $name {
            fn primitive_type(&self) -> $crate::types::PrimitiveType {
                $crate::types::PrimitiveType::$prim
            }

            fn host_type(&self) -> $crate::types::HostType {
                $crate::types::HostType::$host
            }

            fn decode(
                &self,
                $bd_ty: &$crate::types::Type,
                $bd_buf: &mut ::bytes::Bytes,
                $bd_cx: &dyn $crate::types::Context,
            ) -> Result<$crate::types::Value, $crate::types::DecodeError> $bd_body
        }

        impl $crate::types::BinaryEncoder for $name {
            fn primitive_type(&self) -> $crate::types::PrimitiveType {
                $crate::types::PrimitiveType::$prim
            }

            fn host_type(&self) -> $crate::types::HostType {
                $crate::types::HostType::$host
            }

            fn encode(
                &self,
                $be_ty: &$crate::types::Type,
                value: &$crate::types::Value,
                buf: &mut ::bytes::BytesMut,
                $be_cx: &dyn $crate::types::Context,
            ) -> Result<(), $crate::types::EncodeError> {
                if value.is_null() {
                    $crate::types::codec::put_null(buf);
                    return Ok(());
                }
                let $be_value = value;
                let $be_buf = buf;
                $be_body
            }
        }
    };
}

pub(crate) use codec;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn length_prefix() {
        let mut buf = Bytes::from_static(&[0xff, 0xff, 0xff, 0xff, 9]);
        assert_eq!(get_length(&mut buf).unwrap(), None);
        assert_eq!(buf.remaining(), 1);

        let mut buf = Bytes::from_static(&[0, 0, 0, 2, b'a', b'b']);
        assert_eq!(get_length(&mut buf).unwrap(), Some(2));
    }

    #[test]
    fn declared_length_past_input() {
        let mut buf = Bytes::from_static(&[0x7f, 0xff, 0xff, 0xff, b'a']);
        let err = get_length(&mut buf).unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { expected: 0x7fff_ffff, remaining: 1 }));
    }

    #[test]
    fn negative_length() {
        let mut buf = Bytes::from_static(&[0xff, 0xff, 0xff, 0xfe]);
        assert!(matches!(get_length(&mut buf), Err(DecodeError::InvalidLength { .. })));
    }

    #[test]
    fn fixed_width_mismatch() {
        let mut buf = Bytes::from_static(&[0, 0, 0, 2, 0, 1, 7]);
        assert!(get_fixed::<4>(&mut buf).is_err());
        // the wrong sized value is still consumed
        assert_eq!(&buf[..], &[7]);
    }
}
