//! Decode/encode plumbing shared by every wire type.
//!
//! Decoding works on an already-parsed [`serde_json::Value`] so that union types can try
//! several shapes against the same input without re-reading bytes. Every failure carries the
//! [`JsonPath`] where it happened. Encoding builds a `Value` field by field, with the
//! null-vs-omit decision made per field through [`FieldPolicy`].
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{DecodeError, DecodeResult, EncodeError, EncodeResult};

/// Location inside a JSON document, rendered as `$.content[0].source`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JsonPath(String);

impl JsonPath {
    pub fn root() -> Self {
        JsonPath("$".to_string())
    }

    pub fn key(&self, key: &str) -> Self {
        JsonPath(format!("{}.{}", self.0, key))
    }

    pub fn index(&self, index: usize) -> Self {
        JsonPath(format!("{}[{}]", self.0, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of the JSON type of `value`, used in mismatch errors
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn mismatch(path: &JsonPath, expected: &'static str, found: &Value) -> DecodeError {
    DecodeError::TypeMismatch {
        path: path.clone(),
        expected,
        found: json_kind(found),
    }
}

/// A type that can be read from untyped JSON
pub trait Decode: Sized {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self>;

    fn decode(value: &Value) -> DecodeResult<Self> {
        Self::decode_at(value, &JsonPath::root())
    }
}

/// A type with a wire representation
pub trait Encode {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value>;

    fn encode(&self) -> EncodeResult<Value> {
        self.encode_at(&JsonPath::root())
    }
}

/// What an optional field looks like on the wire when it has no value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Leave the key out entirely
    OmitIfAbsent,
    /// Write the key with a `null` value
    EmitExplicitNull,
}

impl Decode for String {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| mismatch(path, "string", value))
    }
}

impl Decode for bool {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        value.as_bool().ok_or_else(|| mismatch(path, "boolean", value))
    }
}

impl Decode for u32 {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| mismatch(path, "unsigned integer", value))
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let items = value.as_array().ok_or_else(|| mismatch(path, "array", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::decode_at(item, &path.index(i)))
            .collect()
    }
}

impl<T: Decode> Decode for BTreeMap<String, T> {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let entries = value.as_object().ok_or_else(|| mismatch(path, "object", value))?;
        entries
            .iter()
            .map(|(key, item)| {
                T::decode_at(item, &path.key(key)).map(|decoded| (key.clone(), decoded))
            })
            .collect()
    }
}

impl Decode for BTreeSet<String> {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        Ok(Vec::<String>::decode_at(value, path)?.into_iter().collect())
    }
}

impl Encode for String {
    fn encode_at(&self, _path: &JsonPath) -> EncodeResult<Value> {
        Ok(Value::String(self.clone()))
    }
}

impl Encode for bool {
    fn encode_at(&self, _path: &JsonPath) -> EncodeResult<Value> {
        Ok(Value::Bool(*self))
    }
}

impl Encode for u32 {
    fn encode_at(&self, _path: &JsonPath) -> EncodeResult<Value> {
        Ok(Value::from(*self))
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        self.iter()
            .enumerate()
            .map(|(i, item)| item.encode_at(&path.index(i)))
            .collect::<EncodeResult<Vec<_>>>()
            .map(Value::Array)
    }
}

impl<T: Encode> Encode for BTreeMap<String, T> {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        let mut map = Map::new();
        for (key, item) in self {
            map.insert(key.clone(), item.encode_at(&path.key(key))?);
        }
        Ok(Value::Object(map))
    }
}

impl Encode for BTreeSet<String> {
    fn encode_at(&self, _path: &JsonPath) -> EncodeResult<Value> {
        Ok(Value::Array(self.iter().cloned().map(Value::String).collect()))
    }
}

/// Field access over a JSON object that reports missing keys and wrong types with their path
pub(crate) struct ObjectReader<'a> {
    map: &'a Map<String, Value>,
    path: &'a JsonPath,
}

impl<'a> ObjectReader<'a> {
    pub fn new(value: &'a Value, path: &'a JsonPath) -> DecodeResult<Self> {
        let map = value.as_object().ok_or_else(|| mismatch(path, "object", value))?;
        Ok(Self { map, path })
    }

    pub fn path(&self) -> &JsonPath {
        self.path
    }

    pub fn required<T: Decode>(&self, field: &'static str) -> DecodeResult<T> {
        match self.map.get(field) {
            Some(value) => T::decode_at(value, &self.path.key(field)),
            None => Err(DecodeError::MissingRequiredField {
                path: self.path.clone(),
                field,
            }),
        }
    }

    /// Absent and `null` both read as `None`
    pub fn optional<T: Decode>(&self, field: &str) -> DecodeResult<Option<T>> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::decode_at(value, &self.path.key(field)).map(Some),
        }
    }
}

/// Builds a JSON object field by field
pub(crate) struct ObjectWriter<'a> {
    map: Map<String, Value>,
    path: &'a JsonPath,
}

impl<'a> ObjectWriter<'a> {
    pub fn new(path: &'a JsonPath) -> Self {
        Self {
            map: Map::new(),
            path,
        }
    }

    pub fn tag(mut self, key: &str, literal: &str) -> Self {
        self.map
            .insert(key.to_string(), Value::String(literal.to_string()));
        self
    }

    pub fn field<T: Encode + ?Sized>(mut self, key: &str, value: &T) -> EncodeResult<Self> {
        let encoded = value.encode_at(&self.path.key(key))?;
        self.map.insert(key.to_string(), encoded);
        Ok(self)
    }

    pub fn optional<T: Encode>(
        mut self,
        key: &str,
        value: Option<&T>,
        policy: FieldPolicy,
    ) -> EncodeResult<Self> {
        match (value, policy) {
            (Some(value), _) => self.field(key, value),
            (None, FieldPolicy::EmitExplicitNull) => {
                self.map.insert(key.to_string(), Value::Null);
                Ok(self)
            }
            (None, FieldPolicy::OmitIfAbsent) => Ok(self),
        }
    }

    pub fn finish(self) -> Value {
        Value::Object(self.map)
    }
}

/// Implements `serde::Serialize`/`Deserialize` for wire types by going through
/// [`Encode`]/[`Decode`], so serde users get the same field policies and trial decoding.
macro_rules! impl_serde_via_codec {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl serde::Serialize for $ty {
                fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    use serde::ser::Error as _;
                    let value = $crate::codec::Encode::encode(self).map_err(S::Error::custom)?;
                    serde::Serialize::serialize(&value, serializer)
                }
            }

            impl<'de> serde::Deserialize<'de> for $ty {
                fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    use serde::de::Error as _;
                    let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                    <$ty as $crate::codec::Decode>::decode(&value).map_err(D::Error::custom)
                }
            }
        )+
    };
}

pub(crate) use impl_serde_via_codec;

pub fn from_value<T: Decode>(value: &Value) -> DecodeResult<T> {
    T::decode(value).map_err(|err| {
        debug!(error = %err, "failed to decode wire value");
        err
    })
}

pub fn from_slice<T: Decode>(bytes: &[u8]) -> DecodeResult<T> {
    let value: Value = serde_json::from_slice(bytes).map_err(|err| {
        debug!(error = %err, "input is not valid JSON");
        DecodeError::Syntax(err.to_string())
    })?;
    from_value(&value)
}

pub fn from_str<T: Decode>(s: &str) -> DecodeResult<T> {
    from_slice(s.as_bytes())
}

pub fn to_value<T: Encode + ?Sized>(value: &T) -> EncodeResult<Value> {
    value.encode()
}

pub fn to_vec<T: Encode + ?Sized>(value: &T) -> EncodeResult<Vec<u8>> {
    serde_json::to_vec(&value.encode()?).map_err(|err| EncodeError::Json(err.to_string()))
}

pub fn to_string<T: Encode + ?Sized>(value: &T) -> EncodeResult<String> {
    serde_json::to_string(&value.encode()?).map_err(|err| EncodeError::Json(err.to_string()))
}

pub fn to_string_pretty<T: Encode + ?Sized>(value: &T) -> EncodeResult<String> {
    serde_json::to_string_pretty(&value.encode()?)
        .map_err(|err| EncodeError::Json(err.to_string()))
}
