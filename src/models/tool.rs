use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug};
use std::sync::Arc;

use serde_json::Value;

use crate::codec::{
    impl_serde_via_codec, Decode, Encode, FieldPolicy, JsonPath, ObjectReader, ObjectWriter,
};
use crate::errors::{DecodeResult, EncodeResult};

/// Local implementation of a tool. Receives the parsed tool input and returns the result text.
pub type ToolCallback = Arc<dyn Fn(&Value) -> anyhow::Result<String> + Send + Sync>;

/// One parameter in a tool's input schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// JSON schema type name, e.g. "string" or "integer"
    pub r#type: String,
    /// Allowed values, written to the wire under the `enum` key
    pub enum_values: Option<Vec<String>>,
    pub description: Option<String>,
}

impl Property {
    pub fn new<S: Into<String>>(r#type: S) -> Self {
        Self {
            r#type: r#type.into(),
            enum_values: None,
            description: None,
        }
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Decode for Property {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let property = ObjectReader::new(value, path)?;
        Ok(Self {
            r#type: property.required("type")?,
            enum_values: property.optional("enum")?,
            description: property.optional("description")?,
        })
    }
}

impl Encode for Property {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        Ok(ObjectWriter::new(path)
            .field("type", &self.r#type)?
            .optional("enum", self.enum_values.as_ref(), FieldPolicy::OmitIfAbsent)?
            .optional("description", self.description.as_ref(), FieldPolicy::OmitIfAbsent)?
            .finish())
    }
}

/// JSON schema for a tool's input. Always an object schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSchema {
    pub properties: BTreeMap<String, Property>,
    pub required: Option<BTreeSet<String>>,
}

impl InputSchema {
    pub const SCHEMA_TYPE: &'static str = "object";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property<S: Into<String>>(mut self, name: S, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn with_required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required
            .get_or_insert_with(BTreeSet::new)
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Required names that have no matching entry in `properties`
    pub fn undeclared_required(&self) -> Vec<&str> {
        self.required
            .iter()
            .flatten()
            .filter(|name| !self.properties.contains_key(*name))
            .map(String::as_str)
            .collect()
    }
}

impl Decode for InputSchema {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let schema = ObjectReader::new(value, path)?;
        Ok(Self {
            properties: schema.required("properties")?,
            required: schema.optional("required")?,
        })
    }
}

impl Encode for InputSchema {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        Ok(ObjectWriter::new(path)
            .tag("type", Self::SCHEMA_TYPE)
            .field("properties", &self.properties)?
            .optional("required", self.required.as_ref(), FieldPolicy::OmitIfAbsent)?
            .finish())
    }
}

/// The wire-visible part of a tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: InputSchema,
}

impl Decode for ToolDefinition {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let tool = ObjectReader::new(value, path)?;
        Ok(Self {
            name: tool.required("name")?,
            description: tool.optional("description")?,
            input_schema: tool.required("input_schema")?,
        })
    }
}

impl Encode for ToolDefinition {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        Ok(ObjectWriter::new(path)
            .field("name", &self.name)?
            .optional("description", self.description.as_ref(), FieldPolicy::OmitIfAbsent)?
            .field("input_schema", &self.input_schema)?
            .finish())
    }
}

/// A tool that can be offered to a model.
///
/// Only the [`ToolDefinition`] has a wire representation. The callback lives beside it, is
/// never encoded, is never produced by decoding, and is ignored by equality.
#[derive(Clone)]
pub struct Tool {
    pub definition: ToolDefinition,
    callback: Option<ToolCallback>,
}

impl Tool {
    pub fn new<S: Into<String>>(name: S, input_schema: InputSchema) -> Self {
        Self {
            definition: ToolDefinition {
                name: name.into(),
                description: None,
                input_schema,
            },
            callback: None,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.definition.description = Some(description.into());
        self
    }

    pub fn with_callback(
        mut self,
        callback: impl Fn(&Value) -> anyhow::Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.callback = Some(Arc::new(callback));
        self
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn description(&self) -> Option<&str> {
        self.definition.description.as_deref()
    }

    pub fn input_schema(&self) -> &InputSchema {
        &self.definition.input_schema
    }

    pub fn callback(&self) -> Option<&ToolCallback> {
        self.callback.as_ref()
    }
}

impl From<ToolDefinition> for Tool {
    fn from(definition: ToolDefinition) -> Self {
        Self {
            definition,
            callback: None,
        }
    }
}

impl PartialEq for Tool {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
    }
}

impl Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.definition.name)
            .field("description", &self.definition.description)
            .field("input_schema", &self.definition.input_schema)
            .field("callback", &self.callback.as_ref().map(|_| "<function>"))
            .finish()
    }
}

impl Decode for Tool {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        ToolDefinition::decode_at(value, path).map(Tool::from)
    }
}

impl Encode for Tool {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        self.definition.encode_at(path)
    }
}

impl_serde_via_codec!(Property, InputSchema, ToolDefinition, Tool);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DecodeError;
    use anyhow::Result;
    use serde_json::json;

    fn get_current_weather(params: &Value) -> anyhow::Result<String> {
        Ok(format!("72F in {}", params["location"].as_str().unwrap_or("?")))
    }

    fn weather_tool() -> Tool {
        Tool::new(
            "get_current_weather",
            InputSchema::new()
                .with_property(
                    "location",
                    Property::new("string")
                        .with_description("The city and state, e.g. San Francisco, CA"),
                )
                .with_property("unit", Property::new("string").with_enum(["celsius", "fahrenheit"]))
                .with_required(["location"]),
        )
        .with_description("Get the current weather in a given location")
    }

    #[test]
    fn test_tool_wire_shape() -> Result<()> {
        let tool = weather_tool().with_callback(get_current_weather);
        assert_eq!(
            tool.encode()?,
            json!({
                "name": "get_current_weather",
                "description": "Get the current weather in a given location",
                "input_schema": {
                    "type": "object",
                    "properties": {
                        "location": {
                            "type": "string",
                            "description": "The city and state, e.g. San Francisco, CA"
                        },
                        "unit": {"type": "string", "enum": ["celsius", "fahrenheit"]}
                    },
                    "required": ["location"]
                }
            })
        );
        Ok(())
    }

    #[test]
    fn test_round_trip_drops_callback() -> Result<()> {
        let tool = weather_tool().with_callback(get_current_weather);
        let decoded = Tool::decode(&tool.encode()?)?;
        assert!(decoded.callback().is_none());
        assert_eq!(decoded, tool);
        assert_eq!(decoded.definition, tool.definition);
        Ok(())
    }

    #[test]
    fn test_callback_does_not_affect_bytes_or_equality() -> Result<()> {
        let with_callback = weather_tool().with_callback(get_current_weather);
        let without_callback = weather_tool();
        assert_eq!(with_callback, without_callback);
        assert_eq!(
            serde_json::to_vec(&with_callback)?,
            serde_json::to_vec(&without_callback)?
        );
        Ok(())
    }

    #[test]
    fn test_absent_optionals_are_omitted() -> Result<()> {
        let tool = Tool::new(
            "ping",
            InputSchema::new().with_property("host", Property::new("string")),
        );
        let encoded = tool.encode()?;
        assert!(encoded.get("description").is_none());
        assert!(encoded["input_schema"].get("required").is_none());
        let property = &encoded["input_schema"]["properties"]["host"];
        assert!(property.get("enum").is_none());
        assert!(property.get("description").is_none());
        assert_eq!(property, &json!({"type": "string"}));

        let decoded = Tool::decode(&encoded)?;
        assert_eq!(decoded.description(), None);
        assert_eq!(decoded.input_schema().required, None);
        Ok(())
    }

    #[test]
    fn test_enum_key_remap() -> Result<()> {
        let property = Property::new("string").with_enum(["a", "b"]);
        let encoded = property.encode()?;
        assert_eq!(encoded, json!({"type": "string", "enum": ["a", "b"]}));
        assert!(encoded.get("enumValues").is_none());

        let decoded = Property::decode(&json!({"type": "string", "enum": ["a", "b"]}))?;
        assert_eq!(
            decoded.enum_values,
            Some(vec!["a".to_string(), "b".to_string()])
        );
        Ok(())
    }

    #[test]
    fn test_callback_is_carried_not_invoked() -> Result<()> {
        let tool = weather_tool().with_callback(get_current_weather);
        let callback = tool.callback().expect("callback attached");
        assert_eq!(callback(&json!({"location": "Chicago, IL"}))?, "72F in Chicago, IL");
        Ok(())
    }

    #[test]
    fn test_tool_debug_output() {
        let tool = weather_tool().with_callback(|_| Ok(String::new()));
        let debug_output = format!("{:?}", tool);
        assert!(debug_output.contains("get_current_weather"));
        assert!(debug_output.contains("<function>"));
    }

    #[test]
    fn test_undeclared_required() {
        let schema = InputSchema::new()
            .with_property("a", Property::new("integer"))
            .with_required(["a", "b"]);
        assert_eq!(schema.undeclared_required(), vec!["b"]);
        assert!(InputSchema::new().undeclared_required().is_empty());
    }

    #[test]
    fn test_missing_input_schema() {
        let err = Tool::decode(&json!({"name": "x"})).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingRequiredField {
                path: JsonPath::root(),
                field: "input_schema",
            }
        );

        let err = Tool::decode(&json!({
            "name": "x",
            "input_schema": {"type": "object", "properties": {"n": {"type": 3}}}
        }))
        .unwrap_err();
        assert_eq!(
            err.path().map(JsonPath::as_str),
            Some("$.input_schema.properties.n.type")
        );
    }
}
