use std::{borrow::Cow, fmt, str::Utf8Error, string::FromUtf8Error};

use super::HostType;
use crate::postgres::Oid;

/// An error when decoding a value.
pub enum DecodeError {
    /// Declared length is larger than the remaining input.
    UnexpectedEof {
        expected: usize,
        remaining: usize,
    },
    /// Declared length is invalid for the type.
    InvalidLength {
        expected: Option<usize>,
        found: i32,
    },
    /// Malformed hex text format, at byte offset.
    InvalidHex(usize),
    /// Malformed backslash escape text format, at byte offset.
    InvalidEscape(usize),
    /// Text representation could not be parsed.
    InvalidText(Cow<'static, str>),
    /// Value has no representation in the host type, such as `infinity`
    /// timestamps.
    OutOfRange,
    /// Postgres return non utf8 string.
    Utf8(Utf8Error),
    /// Value is NULL but the requested type is not nullable.
    Null,
    /// Value host type is not the requested type.
    TypeMismatch {
        expected: HostType,
        found: HostType,
    },
    /// Column requested not found.
    ColumnNotFound(Cow<'static, str>),
    /// Index requested is out of bounds.
    IndexOutOfBounds(usize),
    /// No codec registered for the column type.
    Unsupported(TypeNotSupported),
    /// Failed to deserialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::Error),
    /// Failed to parse date time.
    #[cfg(feature = "time")]
    Time(time::error::Parse),
}

/// An error when encoding a value.
pub enum EncodeError {
    /// Value host type is not accepted by the encoder.
    TypeMismatch {
        expected: HostType,
        found: Option<HostType>,
    },
    /// Value does not fit in the target type.
    OutOfRange,
    /// Value is longer than the protocol can frame.
    TooLong(usize),
    /// NULL has no text representation.
    Null,
    /// Number of values does not match the statement parameters.
    ParamCount {
        expected: usize,
        found: usize,
    },
    /// Failed to serialize using `serde_json`.
    #[cfg(feature = "json")]
    Json(serde_json::Error),
    /// Failed to format date time.
    #[cfg(feature = "time")]
    Time(time::error::Format),
}

/// No codec registered for the requested type.
#[derive(Clone)]
pub enum TypeNotSupported {
    Oid(Oid),
    Name(Cow<'static, str>),
    Host(HostType),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for DecodeError {
            fn from($pat: $ty) -> Self {
                $body
            }
        }
    };
}

from!(<Utf8Error>e => Self::Utf8(e));
from!(<FromUtf8Error>e => Self::Utf8(e.utf8_error()));
from!(<TypeNotSupported>e => Self::Unsupported(e));
#[cfg(feature = "json")]
from!(<serde_json::Error>e => Self::Json(e));
#[cfg(feature = "time")]
from!(<time::error::Parse>e => Self::Time(e));

impl std::error::Error for DecodeError { }

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to decode value, ")?;
        match self {
            Self::UnexpectedEof { expected, remaining } => {
                write!(f, "declared length {expected} but only {remaining} bytes remaining")
            },
            Self::InvalidLength { expected: Some(e), found } => write!(f, "expected length {e}, found {found}"),
            Self::InvalidLength { expected: None, found } => write!(f, "invalid length {found}"),
            Self::InvalidHex(at) => write!(f, "invalid hex format at {at}"),
            Self::InvalidEscape(at) => write!(f, "invalid escape format at {at}"),
            Self::InvalidText(reason) => f.write_str(reason),
            Self::OutOfRange => f.write_str("value out of range of the host type"),
            Self::Utf8(e) => write!(f, "{e}"),
            Self::Null => write!(f, "unexpected NULL value"),
            Self::TypeMismatch { expected, found } => write!(f, "expected {expected:?}, found {found:?}"),
            Self::ColumnNotFound(name) => write!(f, "column not found: {name:?}"),
            Self::IndexOutOfBounds(u) => write!(f, "index out of bounds: {u:?}"),
            Self::Unsupported(e) => write!(f, "{e}"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
            #[cfg(feature = "time")]
            Self::Time(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for EncodeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

#[cfg(feature = "time")]
impl From<time::error::Format> for EncodeError {
    fn from(e: time::error::Format) -> Self {
        Self::Time(e)
    }
}

impl std::error::Error for EncodeError { }

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to encode value, ")?;
        match self {
            Self::TypeMismatch { expected, found: Some(found) } => write!(f, "expected {expected:?}, found {found:?}"),
            Self::TypeMismatch { expected, found: None } => write!(f, "expected {expected:?}, found NULL"),
            Self::OutOfRange => f.write_str("value out of range"),
            Self::TooLong(len) => write!(f, "value of {len} bytes is too long"),
            Self::Null => f.write_str("NULL has no text representation"),
            Self::ParamCount { expected, found } => write!(f, "expected {expected} parameters, found {found}"),
            #[cfg(feature = "json")]
            Self::Json(e) => write!(f, "{e}"),
            #[cfg(feature = "time")]
            Self::Time(e) => write!(f, "{e}"),
        }
    }
}

impl fmt::Debug for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for TypeNotSupported { }

impl fmt::Display for TypeNotSupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Oid(oid) => write!(f, "type not supported: oid {oid}"),
            Self::Name(name) => write!(f, "type not supported: {name}"),
            Self::Host(host) => write!(f, "type not supported: host type {host:?}"),
        }
    }
}

impl fmt::Debug for TypeNotSupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
