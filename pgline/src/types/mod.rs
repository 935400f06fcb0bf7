//! Type codec subsystem.
//!
//! Every wire type is described by a [`Type`], its [`PrimitiveType`] shape,
//! and four codec functions: text encode, text decode, binary encode, binary
//! decode. The [`Registry`] maps type identifiers and host types to those
//! codecs, and is the single place new types are added.
//!
//! Codecs never read ambient state, per connection settings come from the
//! [`Context`] passed into every call.
//!
//! Built in types:
//!
//! - `bool`
//! - `bytea`
//! - `int2`, `int4`, `int8`
//! - `float4`, `float8`
//! - `text`, `varchar`, `bpchar`, `name`
//! - `json`, `jsonb`, requires `json` feature, see [`Json`]
//! - `timestamp`, `timestamptz`, requires `time` feature, via [`time`][::time]'s
//!   [`PrimitiveDateTime`][tp] and [`UtcDateTime`][tu]
//!
//! [tp]: ::time::PrimitiveDateTime
//! [tu]: ::time::UtcDateTime
pub(crate) mod codec;
mod context;
mod error;
mod registry;
mod value;

mod boolean;
mod bytea;
mod float;
mod int;
mod text;

#[cfg(feature = "json")]
mod json;
#[cfg(feature = "json")]
pub use json::Json;

#[cfg(feature = "time")]
mod timestamp;

pub use codec::{BinaryDecoder, BinaryEncoder, Codec, TextDecoder, TextEncoder};
pub use context::{ByteaOutput, Context, SessionContext, Settings};
pub use error::{DecodeError, EncodeError, TypeNotSupported};
pub use registry::Registry;
pub use value::{FromValue, Value};

use crate::postgres::Oid;

/// The physical wire representation of a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    Int2,
    Int4,
    Int8,
    Float,
    Double,
    String,
    Binary,
    Json,
    Timestamp,
    TimestampTZ,
}

/// Host representation a codec produces or consumes, one per [`Value`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostType {
    Bool,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bytes,
    Json,
    Timestamp,
    TimestampTz,
}

/// A wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Type {
    oid: Oid,
    name: &'static str,
    primitive: PrimitiveType,
}

impl Type {
    pub const fn new(oid: Oid, name: &'static str, primitive: PrimitiveType) -> Type {
        Self { oid, name, primitive }
    }

    pub const fn oid(&self) -> Oid {
        self.oid
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn primitive(&self) -> PrimitiveType {
        self.primitive
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}
