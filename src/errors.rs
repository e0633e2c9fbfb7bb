use thiserror::Error;

use crate::codec::JsonPath;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Unknown content block at {path}")]
    UnknownContentBlock { path: JsonPath },

    #[error("Unknown content at {path}")]
    UnknownContent {
        path: JsonPath,
        #[source]
        source: Option<Box<DecodeError>>,
    },

    #[error("Missing required field `{field}` at {path}")]
    MissingRequiredField { path: JsonPath, field: &'static str },

    #[error("Type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: JsonPath,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unknown value {value:?} at {path}, expected one of: {expected}")]
    UnknownVariant {
        path: JsonPath,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid JSON: {0}")]
    Syntax(String),
}

impl DecodeError {
    /// Location of the failure, if the input parsed as JSON at all
    pub fn path(&self) -> Option<&JsonPath> {
        match self {
            DecodeError::UnknownContentBlock { path }
            | DecodeError::UnknownContent { path, .. }
            | DecodeError::MissingRequiredField { path, .. }
            | DecodeError::TypeMismatch { path, .. }
            | DecodeError::UnknownVariant { path, .. } => Some(path),
            DecodeError::Syntax(_) => None,
        }
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Tool result at {path} contains a nested tool block")]
    NestedToolBlock { path: JsonPath },

    #[error("JSON serialization failed: {0}")]
    Json(String),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type EncodeResult<T> = Result<T, EncodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_include_path() {
        let path = JsonPath::root().key("content").index(2);
        let err = DecodeError::UnknownContentBlock { path: path.clone() };
        assert_eq!(err.to_string(), "Unknown content block at $.content[2]");
        assert_eq!(err.path(), Some(&path));

        let err = DecodeError::TypeMismatch {
            path: JsonPath::root().key("usage").key("input_tokens"),
            expected: "unsigned integer",
            found: "string",
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch at $.usage.input_tokens: expected unsigned integer, found string"
        );
    }

    #[test]
    fn test_unknown_content_exposes_source() {
        use std::error::Error;

        let inner = DecodeError::UnknownContentBlock {
            path: JsonPath::root().index(0),
        };
        let err = DecodeError::UnknownContent {
            path: JsonPath::root(),
            source: Some(Box::new(inner.clone())),
        };
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source, Some(inner.to_string()));
        assert_eq!(DecodeError::Syntax("eof".into()).path(), None);
    }
}
