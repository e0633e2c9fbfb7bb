use std::fmt;

use serde_json::Value;

use crate::codec::{impl_serde_via_codec, mismatch, Decode, Encode, JsonPath};
use crate::errors::{DecodeError, DecodeResult, EncodeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Decode for Role {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        match value.as_str() {
            Some("user") => Ok(Role::User),
            Some("assistant") => Ok(Role::Assistant),
            Some(other) => Err(DecodeError::UnknownVariant {
                path: path.clone(),
                value: other.to_string(),
                expected: "user, assistant",
            }),
            None => Err(mismatch(path, "string", value)),
        }
    }
}

impl Encode for Role {
    fn encode_at(&self, _path: &JsonPath) -> EncodeResult<Value> {
        Ok(Value::String(self.as_str().to_string()))
    }
}

impl_serde_via_codec!(Role);
