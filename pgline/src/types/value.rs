use bytes::Bytes;

use super::{DecodeError, HostType};

/// A decoded value, or a value to encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Bytes),
    #[cfg(feature = "json")]
    Json(serde_json::Value),
    #[cfg(feature = "time")]
    Timestamp(time::PrimitiveDateTime),
    #[cfg(feature = "time")]
    TimestampTz(time::UtcDateTime),
}

impl Value {
    /// Returns `true` if value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns host type, `None` for NULL.
    pub fn host_type(&self) -> Option<HostType> {
        let host = match self {
            Self::Null => return None,
            Self::Bool(_) => HostType::Bool,
            Self::Int16(_) => HostType::Int16,
            Self::Int32(_) => HostType::Int32,
            Self::Int64(_) => HostType::Int64,
            Self::Float32(_) => HostType::Float32,
            Self::Float64(_) => HostType::Float64,
            Self::String(_) => HostType::String,
            Self::Bytes(_) => HostType::Bytes,
            #[cfg(feature = "json")]
            Self::Json(_) => HostType::Json,
            #[cfg(feature = "time")]
            Self::Timestamp(_) => HostType::Timestamp,
            #[cfg(feature = "time")]
            Self::TimestampTz(_) => HostType::TimestampTz,
        };
        Some(host)
    }

    /// Convert into host type using [`FromValue`] implementation.
    pub fn get<T: FromValue>(self) -> Result<T, DecodeError> {
        T::from_value(self)
    }
}

/// Type that can be constructed from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, DecodeError>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            value => T::from_value(value).map(Some),
        }
    }
}

fn mismatch(expected: HostType, value: Value) -> DecodeError {
    match value.host_type() {
        Some(found) => DecodeError::TypeMismatch { expected, found },
        None => DecodeError::Null,
    }
}

macro_rules! value {
    ($($ty:ty => $variant:ident $(| $widen:ident)*;)*) => {$(
        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, DecodeError> {
                match value {
                    Value::$variant(v) => Ok(v.into()),
                    $(Value::$widen(v) => Ok(v.into()),)*
                    value => Err(mismatch(HostType::$variant, value)),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Self::$variant(value.into())
            }
        }
    )*};
}

value! {
    bool => Bool;
    i16 => Int16;
    i32 => Int32 | Int16;
    i64 => Int64 | Int32 | Int16;
    f32 => Float32;
    f64 => Float64 | Float32;
    String => String;
    Bytes => Bytes;
}

#[cfg(feature = "json")]
value! {
    serde_json::Value => Json;
}

#[cfg(feature = "time")]
value! {
    time::PrimitiveDateTime => Timestamp;
    time::UtcDateTime => TimestampTz;
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        Bytes::from_value(value).map(Into::into)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value.into())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn widening_from_value() {
        assert_eq!(Value::Int16(7).get::<i64>().unwrap(), 7);
        assert_eq!(Value::Float32(0.5).get::<f64>().unwrap(), 0.5);
        assert!(matches!(
            Value::Int64(7).get::<i32>(),
            Err(DecodeError::TypeMismatch { expected: HostType::Int32, found: HostType::Int64 })
        ));
    }

    #[test]
    fn null_is_not_empty() {
        assert!(matches!(Value::Null.get::<Bytes>(), Err(DecodeError::Null)));
        assert_eq!(Value::Null.get::<Option<Bytes>>().unwrap(), None);
        assert_eq!(Value::from(None::<Vec<u8>>), Value::Null);
        assert_eq!(Value::from(Vec::<u8>::new()), Value::Bytes(Bytes::new()));
    }
}
