use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::{
    DecodeError, EncodeError, FromValue, HostType, Value,
    codec::{codec, get_length},
};

/// jsonb binary format version.
const JSONB_VERSION: u8 = 1;

fn as_json(value: &Value) -> Result<&serde_json::Value, EncodeError> {
    match value {
        Value::Json(json) => Ok(json),
        value => Err(EncodeError::TypeMismatch { expected: HostType::Json, found: value.host_type() }),
    }
}

fn encode_text(value: &Value, out: &mut String) -> Result<(), EncodeError> {
    out.push_str(&serde_json::to_string(as_json(value)?)?);
    Ok(())
}

codec! {
    /// `json` codec, binary format is the json text.
    pub struct JsonCodec: Json => Json;

    fn text_decode(_, text, _) {
        Ok(Value::Json(serde_json::from_str(text)?))
    }

    fn text_encode(_, value, out, _) {
        encode_text(value, out)
    }

    fn binary_decode(_, buf, _) {
        let Some(len) = get_length(buf)? else {
            return Ok(Value::Null);
        };
        Ok(Value::Json(serde_json::from_slice(&buf.split_to(len))?))
    }

    fn binary_encode(_, value, buf, _) {
        let json = serde_json::to_vec(as_json(value)?)?;
        super::codec::put_framed(buf, &json)
    }
}

codec! {
    /// `jsonb` codec, binary format is a version byte followed by the json text.
    pub struct JsonbCodec: Json => Json;

    fn text_decode(_, text, _) {
        Ok(Value::Json(serde_json::from_str(text)?))
    }

    fn text_encode(_, value, out, _) {
        encode_text(value, out)
    }

    fn binary_decode(_, buf, _) {
        let Some(len) = get_length(buf)? else {
            return Ok(Value::Null);
        };
        let mut value = buf.split_to(len);
        match value.has_remaining().then(||value.get_u8()) {
            Some(JSONB_VERSION) => { },
            _ => return Err(DecodeError::InvalidText("unsupported jsonb version".into())),
        }
        Ok(Value::Json(serde_json::from_slice(&value)?))
    }

    fn binary_encode(_, value, buf, _) {
        let json = serde_json::to_vec(as_json(value)?)?;
        let Ok(len) = i32::try_from(json.len() + 1) else {
            return Err(EncodeError::TooLong(json.len()));
        };
        buf.put_i32(len);
        buf.put_u8(JSONB_VERSION);
        buf.put_slice(&json);
        Ok(())
    }
}

/// Decode and encode any serde type as postgres json.
///
/// ```
/// use pgline::types::{Json, Value};
/// use std::collections::HashMap;
///
/// let point = HashMap::from([("x", 1), ("y", 2)]);
/// let value = Value::try_from(Json(point)).unwrap();
/// let Json(point) = value.get::<Json<HashMap<String, i32>>>().unwrap();
/// assert_eq!(point["x"], 1);
/// ```
#[derive(Debug)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned> FromValue for Json<T> {
    fn from_value(value: Value) -> Result<Self, DecodeError> {
        let json = serde_json::Value::from_value(value)?;
        Ok(Json(serde_json::from_value(json)?))
    }
}

impl<T: Serialize> TryFrom<Json<T>> for Value {
    type Error = EncodeError;

    fn try_from(Json(value): Json<T>) -> Result<Self, Self::Error> {
        Ok(Value::Json(serde_json::to_value(value)?))
    }
}

impl<T: Serialize> Serialize for Json<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Json<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Self(T::deserialize(deserializer)?))
    }
}
