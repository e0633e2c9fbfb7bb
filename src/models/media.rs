use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;

use crate::codec::{
    impl_serde_via_codec, mismatch, Decode, Encode, JsonPath, ObjectReader, ObjectWriter,
};
use crate::errors::{DecodeError, DecodeResult, EncodeResult};

/// Image formats accepted inside an image content block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Jpeg,
    Png,
    Gif,
    Webp,
}

impl MediaType {
    pub const ALL: [MediaType; 4] = [
        MediaType::Jpeg,
        MediaType::Png,
        MediaType::Gif,
        MediaType::Webp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
            MediaType::Gif => "image/gif",
            MediaType::Webp => "image/webp",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|media_type| media_type.as_str() == mime)
    }

    /// Guess the format from the leading magic bytes of raw image data
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(MediaType::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(MediaType::Png)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(MediaType::Gif)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(MediaType::Webp)
        } else {
            None
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Decode for MediaType {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let mime = value.as_str().ok_or_else(|| mismatch(path, "string", value))?;
        Self::from_mime(mime).ok_or_else(|| DecodeError::UnknownVariant {
            path: path.clone(),
            value: mime.to_string(),
            expected: "image/jpeg, image/png, image/gif, image/webp",
        })
    }
}

impl Encode for MediaType {
    fn encode_at(&self, _path: &JsonPath) -> EncodeResult<Value> {
        Ok(Value::String(self.as_str().to_string()))
    }
}

/// Inline base64 image payload. The `data` string is carried as-is and only decoded on request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSource {
    pub media_type: MediaType,
    pub data: String,
}

impl ImageSource {
    /// The only source encoding the wire format defines
    pub const ENCODING: &'static str = "base64";

    pub fn new<S: Into<String>>(media_type: MediaType, data: S) -> Self {
        Self {
            media_type,
            data: data.into(),
        }
    }

    pub fn from_bytes(media_type: MediaType, bytes: &[u8]) -> Self {
        Self::new(media_type, STANDARD.encode(bytes))
    }

    /// Like [`ImageSource::from_bytes`] but detects the media type, if it is a supported one
    pub fn from_bytes_sniffed(bytes: &[u8]) -> Option<Self> {
        MediaType::sniff(bytes).map(|media_type| Self::from_bytes(media_type, bytes))
    }

    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

impl Decode for ImageSource {
    fn decode_at(value: &Value, path: &JsonPath) -> DecodeResult<Self> {
        let source = ObjectReader::new(value, path)?;
        Ok(Self {
            media_type: source.required("media_type")?,
            data: source.required("data")?,
        })
    }
}

impl Encode for ImageSource {
    fn encode_at(&self, path: &JsonPath) -> EncodeResult<Value> {
        Ok(ObjectWriter::new(path)
            .tag("type", Self::ENCODING)
            .field("media_type", &self.media_type)?
            .field("data", &self.data)?
            .finish())
    }
}

impl_serde_via_codec!(MediaType, ImageSource);
