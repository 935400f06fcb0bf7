use bytes::BufMut;

use super::{
    DecodeError, EncodeError, HostType, Value,
    codec::{codec, get_fixed},
};

codec! {
    /// `bool` codec.
    pub struct Bool: Bool => Bool;

    fn text_decode(_, text, _) {
        let value = match text.trim() {
            t if ["t", "true", "y", "yes", "on", "1"].iter().any(|e|t.eq_ignore_ascii_case(e)) => true,
            f if ["f", "false", "n", "no", "off", "0"].iter().any(|e|f.eq_ignore_ascii_case(e)) => false,
            _ => return Err(DecodeError::InvalidText(format!("invalid boolean: {text:?}").into())),
        };
        Ok(Value::Bool(value))
    }

    fn text_encode(_, value, out, _) {
        out.push_str(if as_bool(value)? { "t" } else { "f" });
        Ok(())
    }

    fn binary_decode(_, buf, _) {
        match get_fixed::<1>(buf)? {
            Some([b]) => Ok(Value::Bool(b != 0)),
            None => Ok(Value::Null),
        }
    }

    fn binary_encode(_, value, buf, _) {
        let value = as_bool(value)?;
        buf.put_i32(1);
        buf.put_u8(value as u8);
        Ok(())
    }
}

fn as_bool(value: &Value) -> Result<bool, EncodeError> {
    match value {
        Value::Bool(b) => Ok(*b),
        value => Err(EncodeError::TypeMismatch { expected: HostType::Bool, found: value.host_type() }),
    }
}
