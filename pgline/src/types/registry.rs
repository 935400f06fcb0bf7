use std::{collections::HashMap, fmt};

use super::{
    BinaryDecoder, BinaryEncoder, Codec, HostType, PrimitiveType, TextDecoder, TextEncoder, Type,
    TypeNotSupported, boolean, bytea, float, int, text,
};
use crate::postgres::{Oid, oid};

/// Codec registry.
///
/// Built once, then shared read only between connections, usually behind an
/// [`Arc`][std::sync::Arc].
///
/// ```
/// use pgline::types::{Registry, HostType};
///
/// let registry = Registry::standard();
/// let codec = registry.lookup_by_name("bytea").unwrap();
/// assert_eq!(codec.host_type(), HostType::Bytes);
/// ```
#[derive(Default)]
pub struct Registry {
    by_oid: HashMap<Oid, Codec>,
    by_name: HashMap<&'static str, Oid>,
    by_host: HashMap<HostType, Oid>,
}

impl Registry {
    /// Create empty registry.
    pub fn new() -> Registry {
        Self::default()
    }

    /// Create registry with every built in type.
    pub fn standard() -> Registry {
        let mut me = Self::new();

        me.register_codec(Type::new(oid::BOOL, "bool", PrimitiveType::Bool), &boolean::Bool);
        me.register_codec(Type::new(oid::BYTEA, "bytea", PrimitiveType::Binary), &bytea::Bytea);
        me.register_codec(Type::new(oid::INT8, "int8", PrimitiveType::Int8), &int::Int8);
        me.register_codec(Type::new(oid::INT2, "int2", PrimitiveType::Int2), &int::Int2);
        me.register_codec(Type::new(oid::INT4, "int4", PrimitiveType::Int4), &int::Int4);
        // first registered type of a host type wins host type lookup
        me.register_codec(Type::new(oid::TEXT, "text", PrimitiveType::String), &text::Text);
        me.register_codec(Type::new(oid::VARCHAR, "varchar", PrimitiveType::String), &text::Text);
        me.register_codec(Type::new(oid::BPCHAR, "bpchar", PrimitiveType::String), &text::Text);
        me.register_codec(Type::new(oid::NAME, "name", PrimitiveType::String), &text::Text);
        me.register_codec(Type::new(oid::FLOAT4, "float4", PrimitiveType::Float), &float::Float4);
        me.register_codec(Type::new(oid::FLOAT8, "float8", PrimitiveType::Double), &float::Float8);

        #[cfg(feature = "json")]
        {
            use super::json;
            me.register_codec(Type::new(oid::JSONB, "jsonb", PrimitiveType::Json), &json::JsonbCodec);
            me.register_codec(Type::new(oid::JSON, "json", PrimitiveType::Json), &json::JsonCodec);
        }

        #[cfg(feature = "time")]
        {
            use super::timestamp;
            me.register_codec(Type::new(oid::TIMESTAMP, "timestamp", PrimitiveType::Timestamp), &timestamp::Timestamp);
            me.register_codec(Type::new(oid::TIMESTAMPTZ, "timestamptz", PrimitiveType::TimestampTZ), &timestamp::TimestampTz);
        }

        me
    }

    /// Register the four codecs of a type.
    ///
    /// Registering an already known type replaces its codecs.
    ///
    /// # Panics
    ///
    /// Panics if a codec primitive type is not the type's primitive type, or
    /// the codecs disagree on host type.
    pub fn register(
        &mut self,
        ty: Type,
        text_encoder: &'static dyn TextEncoder,
        text_decoder: &'static dyn TextDecoder,
        binary_encoder: &'static dyn BinaryEncoder,
        binary_decoder: &'static dyn BinaryDecoder,
    ) {
        let primitives = [
            text_encoder.primitive_type(),
            text_decoder.primitive_type(),
            binary_encoder.primitive_type(),
            binary_decoder.primitive_type(),
        ];
        assert!(
            primitives.iter().all(|e|*e == ty.primitive()),
            "codec primitive type missmatch for `{ty}`: {primitives:?}"
        );

        let host = binary_decoder.host_type();
        assert!(
            [text_encoder.host_type(), text_decoder.host_type(), binary_encoder.host_type()]
                .iter()
                .all(|e|*e == host),
            "codec host type missmatch for `{ty}`"
        );

        let oid = ty.oid();
        let replaced = self.by_oid.remove(&oid).map(|old|self.unlink(oid, &old));

        self.by_oid.insert(oid, Codec {
            ty,
            text_encoder,
            text_decoder,
            binary_encoder,
            binary_decoder,
        });
        self.by_name.insert(ty.name(), oid);
        self.by_host.entry(host).or_insert(oid);

        // another type of the same host type takes over the lookup
        if let Some(old_host) = replaced.flatten() {
            let next = self.by_oid.values().filter(|e|e.host_type() == old_host).map(|e|e.ty.oid()).min();
            if let Some(next) = next {
                self.by_host.entry(old_host).or_insert(next);
            }
        }
    }

    /// Remove lookup entries of a replaced codec.
    ///
    /// Returns the host type if its host type lookup pointed at `oid`.
    fn unlink(&mut self, oid: Oid, old: &Codec) -> Option<HostType> {
        if self.by_name.get(old.ty.name()) == Some(&oid) {
            self.by_name.remove(old.ty.name());
        }
        let host = old.host_type();
        match self.by_host.get(&host) == Some(&oid) {
            true => {
                self.by_host.remove(&host);
                Some(host)
            },
            false => None,
        }
    }

    /// Register a type whose four codecs are one value.
    pub fn register_codec<C>(&mut self, ty: Type, codec: &'static C)
    where
        C: TextEncoder + TextDecoder + BinaryEncoder + BinaryDecoder,
    {
        self.register(ty, codec, codec, codec, codec);
    }

    pub fn lookup_by_type(&self, oid: Oid) -> Result<&Codec, TypeNotSupported> {
        self.by_oid.get(&oid).ok_or(TypeNotSupported::Oid(oid))
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<&Codec, TypeNotSupported> {
        self.by_name
            .get(name)
            .and_then(|oid|self.by_oid.get(oid))
            .ok_or_else(||TypeNotSupported::Name(name.to_owned().into()))
    }

    pub fn lookup_by_host_type(&self, host: HostType) -> Result<&Codec, TypeNotSupported> {
        self.by_host
            .get(&host)
            .and_then(|oid|self.by_oid.get(oid))
            .ok_or(TypeNotSupported::Host(host))
    }

    /// Returns `true` if type is registered.
    pub fn contains(&self, oid: Oid) -> bool {
        self.by_oid.contains_key(&oid)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.by_oid.values().map(|e|e.ty.name())).finish()
    }
}

#[cfg(test)]
mod test {
    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::types::{DecodeError, EncodeError, SessionContext, Value, Context};

    #[test]
    fn lookup() {
        let registry = Registry::standard();
        assert_eq!(registry.lookup_by_type(oid::BYTEA).unwrap().ty.name(), "bytea");
        assert_eq!(registry.lookup_by_name("int4").unwrap().ty.oid(), oid::INT4);
        assert_eq!(registry.lookup_by_host_type(HostType::String).unwrap().ty.oid(), oid::TEXT);
        assert_eq!(registry.lookup_by_host_type(HostType::Int64).unwrap().ty.oid(), oid::INT8);
    }

    #[test]
    fn lookup_miss() {
        let registry = Registry::new();
        assert!(matches!(registry.lookup_by_type(oid::BYTEA), Err(TypeNotSupported::Oid(17))));
        assert!(matches!(registry.lookup_by_host_type(HostType::Bool), Err(TypeNotSupported::Host(HostType::Bool))));
        assert!(registry.lookup_by_name("int4").is_err());
    }

    struct Upper;

    impl TextDecoder for Upper {
        fn primitive_type(&self) -> PrimitiveType { PrimitiveType::String }
        fn host_type(&self) -> HostType { HostType::String }
        fn decode(&self, _: &Type, text: &str, _: &dyn Context) -> Result<Value, DecodeError> {
            Ok(Value::String(text.to_uppercase()))
        }
    }

    #[test]
    fn custom_type_without_touching_builtin() {
        const CITEXT: Type = Type::new(90001, "citext", PrimitiveType::String);
        let mut registry = Registry::standard();
        registry.register(CITEXT, &text::Text, &Upper, &text::Text, &text::Text);

        let cx = SessionContext::default();
        let codec = registry.lookup_by_type(90001).unwrap();
        let value = codec.text_decoder.decode(&codec.ty, "abc", &cx).unwrap();
        assert_eq!(value, Value::String("ABC".into()));

        // host type lookup still resolves the first registered `text`
        assert_eq!(registry.lookup_by_host_type(HostType::String).unwrap().ty.oid(), oid::TEXT);

        let mut buf = BytesMut::new();
        codec.binary_encoder.encode(&codec.ty, &Value::from("x"), &mut buf, &cx).unwrap();
        let value = codec.binary_decoder.decode(&codec.ty, &mut Bytes::from(buf), &cx).unwrap();
        assert_eq!(value, Value::String("x".into()));
    }

    #[test]
    fn reregister_replaces_every_lookup() {
        const BYTEA_AS_TEXT: Type = Type::new(oid::BYTEA, "bytea_as_text", PrimitiveType::String);
        let mut registry = Registry::standard();
        registry.register_codec(BYTEA_AS_TEXT, &text::Text);

        let codec = registry.lookup_by_type(oid::BYTEA).unwrap();
        assert_eq!(codec.ty.name(), "bytea_as_text");
        assert_eq!(codec.host_type(), HostType::String);

        // no other type decodes into bytes
        assert!(matches!(registry.lookup_by_host_type(HostType::Bytes), Err(TypeNotSupported::Host(HostType::Bytes))));
        assert!(registry.lookup_by_name("bytea").is_err());
        assert_eq!(registry.lookup_by_name("bytea_as_text").unwrap().ty.oid(), oid::BYTEA);
        assert_eq!(registry.lookup_by_host_type(HostType::String).unwrap().ty.oid(), oid::TEXT);
    }

    #[test]
    fn reregister_hands_host_lookup_to_remaining_type() {
        const TEXT_AS_INT: Type = Type::new(oid::TEXT, "text_as_int", PrimitiveType::Int4);
        let mut registry = Registry::standard();
        registry.register_codec(TEXT_AS_INT, &int::Int4);

        let codec = registry.lookup_by_host_type(HostType::String).unwrap();
        assert_ne!(codec.ty.oid(), oid::TEXT);
        assert_eq!(codec.host_type(), HostType::String);
        assert_eq!(registry.lookup_by_host_type(HostType::Int32).unwrap().ty.oid(), oid::INT4);
    }

    #[test]
    #[should_panic]
    fn primitive_missmatch() {
        let mut registry = Registry::new();
        registry.register_codec(Type::new(1, "oops", PrimitiveType::Int4), &text::Text);
    }

    #[test]
    fn encoder_rejects_other_host_type() {
        let registry = Registry::standard();
        let cx = SessionContext::default();
        let codec = registry.lookup_by_type(oid::BYTEA).unwrap();
        let err = codec.binary_encoder.encode(&codec.ty, &Value::Bool(true), &mut BytesMut::new(), &cx);
        assert!(matches!(err, Err(EncodeError::TypeMismatch { expected: HostType::Bytes, .. })));
    }
}
