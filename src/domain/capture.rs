//! Captured images and their self-describing data payloads.
//!
//! Clients send images as `data:<mime>;base64,<payload>` strings. The raw
//! string is what gets archived; the parsed form is what gets described.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while interpreting a capture payload
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Image is not a data URI (starts with {0:?})")]
    NotDataUri(String),

    #[error("Data URI is missing the ';base64,' marker")]
    NotBase64,

    #[error("Data URI has an empty MIME type")]
    MissingMimeType,

    #[error("Data URI has an empty payload")]
    EmptyPayload,
}

/// One captured image as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capture {
    /// Self-describing image payload (data URI)
    pub image: String,
}

impl Capture {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }

    /// Build a capture from raw image bytes
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self::new(ImagePayload::from_bytes(mime_type, bytes).to_data_uri())
    }

    /// Parse the image into its MIME type and base64 data
    pub fn payload(&self) -> Result<ImagePayload, CaptureError> {
        ImagePayload::parse(&self.image)
    }
}

/// A parsed `data:` URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    mime_type: String,
    data: String,
}

impl ImagePayload {
    /// Parse `data:<mime>;base64,<data>`
    pub fn parse(uri: &str) -> Result<Self, CaptureError> {
        let rest = uri.strip_prefix("data:").ok_or_else(|| {
            CaptureError::NotDataUri(uri.chars().take(16).collect())
        })?;

        let (mime_type, data) = rest.split_once(";base64,").ok_or(CaptureError::NotBase64)?;

        if mime_type.is_empty() {
            return Err(CaptureError::MissingMimeType);
        }
        if data.trim().is_empty() {
            return Err(CaptureError::EmptyPayload);
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.trim().to_string(),
        })
    }

    /// Encode raw bytes
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 data without the URI prefix
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Guess an image MIME type from a file extension
pub fn mime_type_for_extension(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => "image/jpeg",
    }
}
