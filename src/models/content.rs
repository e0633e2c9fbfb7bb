use std::fmt;

use serde_json::Value;
use tracing::trace;

use super::media::ImageSource;
use crate::codec::{impl_serde_via_codec, Decode, Encode, JsonPath, ObjectReader, ObjectWriter};
use crate::errors::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::objectid::tool_use_id;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlock {
    pub source: ImageSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A request from the model to run a tool
pub struct ToolUse {
    pub id: String,
    pub name: String,
    /// Tool arguments as an encoded string, passed through untouched
    pub input: String,
}

impl ToolUse {
    /// Create a tool use with a freshly generated `toolu_` id
    pub fn new<N: Into<String>, I: Into<String>>(name: N, input: I) -> Self {
        Self {
            id: tool_use_id(),
            name: name.into(),
            input: input.into(),
        }
    }

    /// Parse the opaque input string as JSON, for callers that execute the tool
    pub fn input_json(&self) -> serde_json::Result<Value> {
        serde_json::from_str(&self.input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The output of a tool run, sent back to the model
pub struct ToolResult {
    pub tool_use_id: String,
    pub is_error: bool,
    /// Must not itself contain tool use or tool result blocks
    pub content: Content,
}

impl ToolResult {
    pub fn success<S: Into<String>, C: Into<Content>>(tool_use_id: S, content: C) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            is_error: false,
            content: content.into(),
        }
    }

    pub fn error<S: Into<String>, C: Into<Content>>(tool_use_id: S, content: C) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            is_error: true,
            content: content.into(),
        }
    }
}

/// The variants of [`ContentBlock`], in the order decoding tries them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentBlockKind {
    Text,
    Image,
    ToolUse,
    ToolResult,
}

impl ContentBlockKind {
    pub const TRIAL_ORDER: [ContentBlockKind; 4] = [
        ContentBlockKind::Text,
        ContentBlockKind::Image,
        ContentBlockKind::ToolUse,
        ContentBlockKind::ToolResult,
    ];

    /// The literal written to the `type` key on encode
    pub fn type_name(&self) -> &'static str {
        match self {
            ContentBlockKind::Text => "text",
            ContentBlockKind::Image => "image",
            ContentBlockKind::ToolUse => "tool_use",
            ContentBlockKind::ToolResult => "tool_result",
        }
    }

    /// Keys that must be present for an object to match this shape.
    /// These sets are pairwise disjoint, which keeps the trial order unambiguous.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            ContentBlockKind::Text => &["text"],
            ContentBlockKind::Image => &["source"],
            ContentBlockKind::ToolUse => &["id", "name", "input"],
            ContentBlockKind::ToolResult => &["tool_use_id", "is_error", "content"],
        }
    }

    fn try_decode(&self, block: &ObjectReader<'_>) -> DecodeResult<ContentBlock> {
        Ok(match self {
            ContentBlockKind::Text => ContentBlock::Text(TextBlock {
                text: block.required("text")?,
            }),
            ContentBlockKind::Image => ContentBlock::Image(ImageBlock {
                source: block.required("source")?,
            }),
            ContentBlockKind::ToolUse => ContentBlock::ToolUse(ToolUse {
                id: block.required("id")?,
                name: block.required("name")?,
                input: block.required("input")?,
            }),
            ContentBlockKind::ToolResult => ContentBlock::ToolResult(ToolResult {
                tool_use_id: block.required("tool_use_id")?,
                is_error: block.required("is_error")?,
                content: block.required("content")?,
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One unit of message content
pub enum ContentBlock {
    Text(TextBlock),
    Image(ImageBlock),
    ToolUse(ToolUse),
    ToolResult(ToolResult),
}

impl ContentBlock {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentBlock::Text(TextBlock { text: text.into() })
    }

    pub fn image(source: ImageSource) -> Self {
        ContentBlock::Image(ImageBlock { source })
    }

    pub fn tool_use<I: Into<String>, N: Into<String>, S: Into<String>>(
        id: I,
        name: N,
        input: S,
    ) -> Self {
        ContentBlock::ToolUse(ToolUse {
            id: id.into(),
            name: name.into(),
            input: input.into(),
        })
    }

    pub fn tool_result(result: ToolResult) -> Self {
        ContentBlock::ToolResult(result)
    }

    pub fn kind(&self) -> ContentBlockKind {
        match self {
            ContentBlock::Text(_) => ContentBlockKind::Text,
            ContentBlock::Image(_) => ContentBlockKind::Image,
            ContentBlock::ToolUse(_) => ContentBlockKind::ToolUse,
            ContentBlock::ToolResult(_) => ContentBlockKind::ToolResult,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind().type_name()
    }

    pub fn is_tool_block(&self) -> bool {
        matches!(self, ContentBlock::ToolUse(_) | ContentBlock::ToolResult(_))
    }

    /// Get the text if this is a Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text(block) => Some(&block.text),
            _ => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<&ToolUse> {
        match self {
            ContentBlock::ToolUse(tool_use) => Some(tool_use),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResult> {
        match self {
            ContentBlock::ToolResult(tool_result) => Some(tool_result),
            _ => None,
        }
    }
}

impl fmt::Display for ContentBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentBlock::Text(block) => write!(f, "text: {}", block.text),
            ContentBlock::Image(block) => write!(f, "image: {}", block.source.media_type),
            ContentBlock::ToolUse(tool_use) => write!(f, "tool use: {}", tool_use.name),
            ContentBlock::ToolResult(result) => write!(f, "tool result: {}", result.content),
        }
    }
}

impl Decode for ContentBlock {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let block = match ObjectReader::new(value, path) {
            Ok(block) => block,
            Err(err) => {
                trace!(path = %path, reason = %err, "content block is not an object");
                return Err(DecodeError::UnknownContentBlock { path: path.clone() });
            }
        };
        for kind in ContentBlockKind::TRIAL_ORDER {
            match kind.try_decode(&block) {
                Ok(decoded) => return Ok(decoded),
                Err(err) => trace!(
                    shape = kind.type_name(),
                    path = %block.path(),
                    reason = %err,
                    "content block shape did not match"
                ),
            }
        }
        Err(DecodeError::UnknownContentBlock { path: path.clone() })
    }
}

impl Encode for ContentBlock {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        let object = ObjectWriter::new(path).tag("type", self.type_name());
        let object = match self {
            ContentBlock::Text(block) => object.field("text", &block.text)?,
            ContentBlock::Image(block) => object.field("source", &block.source)?,
            ContentBlock::ToolUse(tool_use) => object
                .field("id", &tool_use.id)?
                .field("name", &tool_use.name)?
                .field("input", &tool_use.input)?,
            ContentBlock::ToolResult(result) => {
                if let Some(index) = result.content.first_tool_block() {
                    return Err(EncodeError::NestedToolBlock {
                        path: path.key("content").index(index),
                    });
                }
                object
                    .field("tool_use_id", &result.tool_use_id)?
                    .field("is_error", &result.is_error)?
                    .field("content", &result.content)?
            }
        };
        Ok(object.finish())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Message content: either a bare string or an ordered list of blocks
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Content {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Content::Text(text.into())
    }

    pub fn blocks(blocks: Vec<ContentBlock>) -> Self {
        Content::Blocks(blocks)
    }

    /// The bare string, if this is the Text variant
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Blocks(_) => None,
        }
    }

    /// The blocks, if this is the Blocks variant
    pub fn as_blocks(&self) -> Option<&[ContentBlock]> {
        match self {
            Content::Text(_) => None,
            Content::Blocks(blocks) => Some(blocks),
        }
    }

    /// All text in reading order, text blocks joined by newlines
    pub fn joined_text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Blocks(blocks) => blocks
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn tool_uses(&self) -> Vec<&ToolUse> {
        self.as_blocks()
            .unwrap_or_default()
            .iter()
            .filter_map(ContentBlock::as_tool_use)
            .collect()
    }

    pub fn tool_results(&self) -> Vec<&ToolResult> {
        self.as_blocks()
            .unwrap_or_default()
            .iter()
            .filter_map(ContentBlock::as_tool_result)
            .collect()
    }

    pub(crate) fn first_tool_block(&self) -> Option<usize> {
        self.as_blocks()?.iter().position(ContentBlock::is_tool_block)
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Text(text) => write!(f, "text: {}", text),
            Content::Blocks(blocks) => {
                let summaries: Vec<String> = blocks.iter().map(ToString::to_string).collect();
                write!(f, "content: [{}]", summaries.join(", "))
            }
        }
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<Vec<ContentBlock>> for Content {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Content::Blocks(blocks)
    }
}

impl Decode for Content {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        match value {
            Value::String(text) => Ok(Content::Text(text.clone())),
            Value::Array(_) => Vec::<ContentBlock>::decode_at(value, path)
                .map(Content::Blocks)
                .map_err(|err| DecodeError::UnknownContent {
                    path: path.clone(),
                    source: Some(Box::new(err)),
                }),
            _ => Err(DecodeError::UnknownContent {
                path: path.clone(),
                source: None,
            }),
        }
    }
}

impl Encode for Content {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        match self {
            Content::Text(text) => text.encode_at(path),
            Content::Blocks(blocks) => blocks.encode_at(path),
        }
    }
}

impl_serde_via_codec!(ContentBlock, Content);
