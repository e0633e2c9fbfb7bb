pub mod codec;
pub mod errors;
pub mod models;
pub mod objectid;

pub use codec::{Decode, Encode, FieldPolicy, JsonPath};
pub use errors::{DecodeError, DecodeResult, EncodeError, EncodeResult};
pub use models::content::{
    Content, ContentBlock, ContentBlockKind, ImageBlock, TextBlock, ToolResult, ToolUse,
};
pub use models::media::{ImageSource, MediaType};
pub use models::message::Message;
pub use models::response::{Response, ResponseType, StopReason, UnknownStopReason, Usage};
pub use models::role::Role;
pub use models::tool::{InputSchema, Property, Tool, ToolCallback, ToolDefinition};
