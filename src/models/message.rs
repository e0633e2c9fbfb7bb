use serde_json::Value;

use super::content::{Content, ContentBlock, ToolResult, ToolUse};
use super::role::Role;
use crate::codec::{impl_serde_via_codec, Decode, Encode, JsonPath, ObjectReader, ObjectWriter};
use crate::errors::{DecodeResult, EncodeResult};

#[derive(Debug, Clone, PartialEq, Eq)]
/// A message to or from an LLM
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn new<C: Into<Content>>(role: Role, content: C) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// A plain-text user message
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, Content::text(text))
    }

    /// A plain-text assistant message
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Assistant, Content::text(text))
    }

    /// A user message answering tool calls
    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        let blocks = results.into_iter().map(ContentBlock::tool_result).collect::<Vec<_>>();
        Self::new(Role::User, blocks)
    }

    pub fn text(&self) -> String {
        self.content.joined_text()
    }

    pub fn tool_use(&self) -> Vec<&ToolUse> {
        self.content.tool_uses()
    }

    pub fn tool_result(&self) -> Vec<&ToolResult> {
        self.content.tool_results()
    }

    pub fn summary(&self) -> String {
        format!("message:{}\n{}", self.role, self.content)
    }
}

impl Decode for Message {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let message = ObjectReader::new(value, path)?;
        Ok(Self {
            role: message.required("role")?,
            content: message.required("content")?,
        })
    }
}

impl Encode for Message {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        Ok(ObjectWriter::new(path)
            .field("role", &self.role)?
            .field("content", &self.content)?
            .finish())
    }
}

impl_serde_via_codec!(Message);
