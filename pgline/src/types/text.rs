use super::{
    EncodeError, HostType, Value,
    codec::{codec, get_length, put_framed},
};

codec! {
    /// `text`, `varchar`, `bpchar` and `name` codec.
    pub struct Text: String => String;

    fn text_decode(_, text, _) {
        Ok(Value::String(text.to_owned()))
    }

    fn text_encode(_, value, out, _) {
        out.push_str(as_str(value)?);
        Ok(())
    }

    fn binary_decode(_, buf, cx) {
        let Some(len) = get_length(buf)? else {
            return Ok(Value::Null);
        };
        let value = buf.split_to(len);
        let value = std::str::from_utf8(&value)?;
        let retain = match cx.settings().field_length_max {
            Some(max) => truncate_len(value, max as usize),
            None => value.len(),
        };
        Ok(Value::String(value[..retain].to_owned()))
    }

    fn binary_encode(_, value, buf, _) {
        put_framed(buf, as_str(value)?.as_bytes())
    }
}

fn as_str(value: &Value) -> Result<&str, EncodeError> {
    match value {
        Value::String(s) => Ok(s),
        value => Err(EncodeError::TypeMismatch { expected: HostType::String, found: value.host_type() }),
    }
}

/// Largest length not over `max` that does not split a character.
fn truncate_len(value: &str, max: usize) -> usize {
    if value.len() <= max {
        return value.len();
    }
    let mut len = max;
    while !value.is_char_boundary(len) {
        len -= 1;
    }
    len
}

#[cfg(test)]
mod test {
    use bytes::{Bytes, BytesMut};
    use std::sync::Arc;

    use super::*;
    use crate::types::{
        BinaryDecoder, BinaryEncoder, DecodeError, PrimitiveType, Registry, SessionContext, Settings, Type,
    };

    const TY: Type = Type::new(25, "text", PrimitiveType::String);

    #[test]
    fn truncation_backs_off_to_char_boundary() {
        let settings = Settings { field_length_max: Some(2), ..Default::default() };
        let cx = SessionContext::new(Arc::new(Registry::standard()), settings);

        // `é` is two bytes, the second byte of the limit falls inside it
        let mut buf = BytesMut::new();
        BinaryEncoder::encode(&Text, &TY, &Value::from("aé!"), &mut buf, &cx).unwrap();
        let mut buf = buf.freeze();
        let value = BinaryDecoder::decode(&Text, &TY, &mut buf, &cx).unwrap();
        assert_eq!(value, Value::from("a"));
        assert!(buf.is_empty());
    }

    #[test]
    fn invalid_utf8() {
        let cx = SessionContext::default();
        let mut buf = Bytes::from_static(&[0, 0, 0, 1, 0xff]);
        assert!(matches!(BinaryDecoder::decode(&Text, &TY, &mut buf, &cx), Err(DecodeError::Utf8(_))));
    }
}
