use std::fmt;

use serde_json::Value;

use super::content::{Content, ToolUse};
use super::role::Role;
use crate::codec::{
    impl_serde_via_codec, mismatch, Decode, Encode, FieldPolicy, JsonPath, ObjectReader,
    ObjectWriter,
};
use crate::errors::{DecodeError, DecodeResult, EncodeResult};

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    StopSequence,
    ToolUse,
    /// A reason this crate does not know about, kept verbatim
    Other(UnknownStopReason),
}

/// Stop reason string outside the known set. Only built by [`StopReason::from`], so it never
/// holds one of the known reasons and always re-decodes to `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownStopReason(String);

impl UnknownStopReason {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl StopReason {
    pub fn as_str(&self) -> &str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::MaxTokens => "max_tokens",
            StopReason::StopSequence => "stop_sequence",
            StopReason::ToolUse => "tool_use",
            StopReason::Other(reason) => reason.as_str(),
        }
    }
}

impl From<&str> for StopReason {
    fn from(reason: &str) -> Self {
        match reason {
            "end_turn" => StopReason::EndTurn,
            "max_tokens" => StopReason::MaxTokens,
            "stop_sequence" => StopReason::StopSequence,
            "tool_use" => StopReason::ToolUse,
            other => StopReason::Other(UnknownStopReason(other.to_string())),
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Decode for StopReason {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        value
            .as_str()
            .map(StopReason::from)
            .ok_or_else(|| mismatch(path, "string", value))
    }
}

impl Encode for StopReason {
    fn encode_at(&self, _path: &JsonPath) -> EncodeResult<Value> {
        Ok(Value::String(self.as_str().to_string()))
    }
}

/// The envelope discriminator; responses are always `"message"`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResponseType {
    #[default]
    Message,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Message => "message",
        }
    }
}

impl Decode for ResponseType {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        match value.as_str() {
            Some("message") => Ok(ResponseType::Message),
            Some(other) => Err(DecodeError::UnknownVariant {
                path: path.clone(),
                value: other.to_string(),
                expected: "message",
            }),
            None => Err(mismatch(path, "string", value)),
        }
    }
}

impl Encode for ResponseType {
    fn encode_at(&self, _path: &JsonPath) -> EncodeResult<Value> {
        Ok(Value::String(self.as_str().to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        u64::from(self.input_tokens) + u64::from(self.output_tokens)
    }
}

impl Decode for Usage {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let usage = ObjectReader::new(value, path)?;
        Ok(Self {
            input_tokens: usage.required("input_tokens")?,
            output_tokens: usage.required("output_tokens")?,
        })
    }
}

impl Encode for Usage {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        Ok(ObjectWriter::new(path)
            .field("input_tokens", &self.input_tokens)?
            .field("output_tokens", &self.output_tokens)?
            .finish())
    }
}

/// A complete, non-streamed model response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub id: String,
    pub response_type: ResponseType,
    pub role: Role,
    pub content: Content,
    pub model: String,
    pub stop_reason: Option<StopReason>,
    pub stop_sequence: Option<String>,
    pub usage: Usage,
}

impl Response {
    pub fn text(&self) -> String {
        self.content.joined_text()
    }

    pub fn tool_uses(&self) -> Vec<&ToolUse> {
        self.content.tool_uses()
    }
}

impl Decode for Response {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let response = ObjectReader::new(value, path)?;
        Ok(Self {
            id: response.required("id")?,
            response_type: response.required("type")?,
            role: response.required("role")?,
            content: response.required("content")?,
            model: response.required("model")?,
            stop_reason: response.optional("stop_reason")?,
            stop_sequence: response.optional("stop_sequence")?,
            usage: response.required("usage")?,
        })
    }
}

impl Encode for Response {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        Ok(ObjectWriter::new(path)
            .field("id", &self.id)?
            .field("type", &self.response_type)?
            .field("role", &self.role)?
            .field("content", &self.content)?
            .field("model", &self.model)?
            .optional("stop_reason", self.stop_reason.as_ref(), FieldPolicy::OmitIfAbsent)?
            .optional(
                "stop_sequence",
                self.stop_sequence.as_ref(),
                FieldPolicy::EmitExplicitNull,
            )?
            .field("usage", &self.usage)?
            .finish())
    }
}

impl_serde_via_codec!(StopReason, ResponseType, Usage, Response);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::models::content::{ContentBlock, ContentBlockKind, ToolResult};
    use crate::models::media::{ImageSource, MediaType};
    use anyhow::Result;
    use serde_json::json;

    const MESSAGE_RESPONSE: &str = r#"{"id":"msg_013Zva2CMHLNnXjNJJKqJ2EF","type":"message","role":"assistant","model":"claude-3-5-sonnet-20240620","content":[{"type":"text","text":"Hi! My name is Claude."}],"stop_reason":"end_turn","stop_sequence":null,"usage":{"input_tokens":10,"output_tokens":25}}"#;

    fn greeting() -> Response {
        Response {
            id: "msg_013Zva2CMHLNnXjNJJKqJ2EF".to_string(),
            response_type: ResponseType::Message,
            role: Role::Assistant,
            content: Content::blocks(vec![ContentBlock::text("Hi! My name is Claude.")]),
            model: "claude-3-5-sonnet-20240620".to_string(),
            stop_reason: Some(StopReason::EndTurn),
            stop_sequence: None,
            usage: Usage::new(10, 25),
        }
    }

    #[test]
    fn test_message_response_decodable() -> Result<()> {
        let response: Response = codec::from_str(MESSAGE_RESPONSE)?;
        assert_eq!(response.id, "msg_013Zva2CMHLNnXjNJJKqJ2EF");
        assert_eq!(response.model, "claude-3-5-sonnet-20240620");
        assert_eq!(response.role, Role::Assistant);
        assert_eq!(response.stop_reason, Some(StopReason::EndTurn));
        assert_eq!(response.stop_sequence, None);
        assert_eq!(response.response_type, ResponseType::Message);
        assert_eq!(response.usage.input_tokens, 10);
        assert_eq!(response.usage.output_tokens, 25);

        let blocks = response.content.as_blocks().expect("blocks variant");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].as_text(), Some("Hi! My name is Claude."));
        assert_eq!(response, greeting());
        Ok(())
    }

    #[test]
    fn test_message_response_encodable() -> Result<()> {
        let encoded = greeting().encode()?;
        let expected: Value = serde_json::from_str(MESSAGE_RESPONSE)?;
        assert_eq!(encoded, expected);
        Ok(())
    }

    #[test]
    fn test_stop_sequence_null_is_kept() -> Result<()> {
        let mut response = greeting();
        response.stop_reason = None;
        let encoded = response.encode()?;

        let object = encoded.as_object().expect("object");
        assert_eq!(object.get("stop_sequence"), Some(&Value::Null));
        assert!(!object.contains_key("stop_reason"));
        assert_eq!(Response::decode(&encoded)?, response);

        response.stop_reason = Some(StopReason::StopSequence);
        response.stop_sequence = Some("\n\nHuman:".to_string());
        let encoded = response.encode()?;
        assert_eq!(encoded["stop_sequence"], json!("\n\nHuman:"));
        assert_eq!(Response::decode(&encoded)?, response);
        Ok(())
    }

    #[test]
    fn test_message_response_with_tool_call() -> Result<()> {
        let value = json!({
            "id": "msg_01Aq9w938a90dw8q",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20240620",
            "content": [
                {"type": "text", "text": "<thinking>I need to call the get_weather function.</thinking>"},
                {
                    "type": "tool_use",
                    "id": "toolu_01A09q90qw90lq917835lq9",
                    "name": "get_weather",
                    "input": "{\"location\": \"San Francisco, CA\", \"unit\": \"celsius\"}"
                }
            ],
            "stop_reason": "tool_use",
            "stop_sequence": null,
            "usage": {"input_tokens": 524, "output_tokens": 73}
        });
        let response = Response::decode(&value)?;
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        let tool_uses = response.tool_uses();
        assert_eq!(tool_uses.len(), 1);
        assert_eq!(tool_uses[0].name, "get_weather");
        assert_eq!(tool_uses[0].input_json()?["unit"], json!("celsius"));
        assert_eq!(
            response.content.as_blocks().map(|b| b[1].kind()),
            Some(ContentBlockKind::ToolUse)
        );
        assert_eq!(response.usage.total(), 597);
        assert_eq!(response.encode()?, value);
        Ok(())
    }

    #[test]
    fn test_unknown_stop_reason_preserved() -> Result<()> {
        let mut value: Value = serde_json::from_str(MESSAGE_RESPONSE)?;
        value["stop_reason"] = json!("refusal");
        let response = Response::decode(&value)?;
        assert_eq!(response.stop_reason, Some(StopReason::from("refusal")));
        assert!(matches!(
            response.stop_reason,
            Some(StopReason::Other(ref reason)) if reason.as_str() == "refusal"
        ));
        assert_eq!(response.encode()?, value);
        Ok(())
    }

    #[test]
    fn test_envelope_type_is_checked() -> Result<()> {
        let mut value: Value = serde_json::from_str(MESSAGE_RESPONSE)?;
        value["type"] = json!("error");
        assert_eq!(
            Response::decode(&value),
            Err(DecodeError::UnknownVariant {
                path: JsonPath::root().key("type"),
                value: "error".to_string(),
                expected: "message",
            })
        );

        value.as_object_mut().expect("object").remove("type");
        assert!(matches!(
            Response::decode(&value),
            Err(DecodeError::MissingRequiredField { field: "type", .. })
        ));
        Ok(())
    }

    #[test]
    fn test_usage_errors_carry_path() -> Result<()> {
        let mut value: Value = serde_json::from_str(MESSAGE_RESPONSE)?;
        value["usage"]["input_tokens"] = json!("10");
        let err = Response::decode(&value).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TypeMismatch {
                path: JsonPath::root().key("usage").key("input_tokens"),
                expected: "unsigned integer",
                found: "string",
            }
        );
        Ok(())
    }

    #[test]
    fn test_bad_content_is_unknown_content() -> Result<()> {
        let mut value: Value = serde_json::from_str(MESSAGE_RESPONSE)?;
        value["content"] = json!({"text": "not a list"});
        assert!(matches!(
            Response::decode(&value),
            Err(DecodeError::UnknownContent { ref path, source: None })
                if path.as_str() == "$.content"
        ));
        Ok(())
    }

    #[test]
    fn test_serde_bridge() -> Result<()> {
        let response: Response = serde_json::from_str(MESSAGE_RESPONSE)?;
        assert_eq!(response, greeting());
        let reparsed: Value = serde_json::from_str(&serde_json::to_string(&response)?)?;
        assert_eq!(reparsed, serde_json::from_str::<Value>(MESSAGE_RESPONSE)?);
        Ok(())
    }

    #[test]
    fn test_known_reason_strings_never_become_other() {
        for reason in ["end_turn", "max_tokens", "stop_sequence", "tool_use"] {
            let stop_reason = StopReason::from(reason);
            assert!(!matches!(stop_reason, StopReason::Other(_)), "{}", reason);
            assert_eq!(stop_reason.as_str(), reason);
        }
        assert!(matches!(StopReason::from("pause_turn"), StopReason::Other(_)));
    }

    #[test]
    fn test_round_trip_every_variant() -> Result<()> {
        let contents = vec![
            Content::text("plain reply"),
            Content::blocks(vec![]),
            Content::blocks(vec![
                ContentBlock::text("see attached"),
                ContentBlock::image(ImageSource::new(MediaType::Webp, "UklGRg==")),
                ContentBlock::tool_use("toolu_1", "lookup", r#"{"q":"rust"}"#),
                ContentBlock::tool_result(ToolResult::success("toolu_0", "cached")),
                ContentBlock::tool_result(ToolResult::error(
                    "toolu_2",
                    vec![
                        ContentBlock::text("failed"),
                        ContentBlock::image(ImageSource::new(MediaType::Jpeg, "/9j/")),
                    ],
                )),
            ]),
        ];
        let stop_reasons = vec![
            None,
            Some(StopReason::EndTurn),
            Some(StopReason::MaxTokens),
            Some(StopReason::StopSequence),
            Some(StopReason::ToolUse),
            Some(StopReason::from("refusal")),
        ];
        let stop_sequences = vec![None, Some("\n\nHuman:".to_string())];

        for content in &contents {
            for stop_reason in &stop_reasons {
                for stop_sequence in &stop_sequences {
                    let response = Response {
                        id: "msg_round_trip".to_string(),
                        response_type: ResponseType::Message,
                        role: Role::Assistant,
                        content: content.clone(),
                        model: "claude-3-5-sonnet-20240620".to_string(),
                        stop_reason: stop_reason.clone(),
                        stop_sequence: stop_sequence.clone(),
                        usage: Usage::new(3, 7),
                    };
                    let encoded = response.encode()?;
                    assert!(encoded.get("stop_sequence").is_some());
                    assert_eq!(encoded.get("stop_reason").is_some(), stop_reason.is_some());

                    let bytes = codec::to_vec(&response)?;
                    let decoded: Response = codec::from_slice(&bytes)?;
                    assert_eq!(decoded, response);
                }
            }
        }
        Ok(())
    }
}
