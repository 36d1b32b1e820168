//! Declared media types and the shared extension table.

use std::fmt;
use thiserror::Error;

pub const VIDEO_MP4: &str = "video/mp4";
pub const IMAGE_JPEG: &str = "image/jpeg";
pub const IMAGE_PNG: &str = "image/png";

/// Extension used for types missing from the table.
pub const FALLBACK_EXTENSION: &str = "bin";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaTypeError {
    #[error("Missing media type")]
    Missing,
    #[error("Malformed media type: {0}")]
    Malformed(String),
}

/// A declared `type/subtype`, lowercased, parameters stripped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType(String);

impl MediaType {
    /// Parse a Content-Type style value such as `video/mp4; codecs="avc1"`.
    pub fn parse(raw: &str) -> Result<Self, MediaTypeError> {
        let essence = raw.split(';').next().unwrap_or_default().trim();
        if essence.is_empty() {
            return Err(MediaTypeError::Missing);
        }

        let (kind, subtype) = essence
            .split_once('/')
            .ok_or_else(|| MediaTypeError::Malformed(raw.to_string()))?;

        let is_token = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
        };
        if !is_token(kind) || !is_token(subtype) {
            return Err(MediaTypeError::Malformed(raw.to_string()));
        }

        Ok(Self(essence.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }

    pub fn is_any_of(&self, accepted: &[&str]) -> bool {
        accepted.iter().any(|a| self.is(a))
    }

    /// File extension for stored objects of this type.
    pub fn extension(&self) -> &'static str {
        extension_for(&self.0)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a media type essence to a file extension. Unknown types map to `bin`.
pub fn extension_for(media_type: &str) -> &'static str {
    match media_type.to_ascii_lowercase().as_str() {
        VIDEO_MP4 => "mp4",
        IMAGE_JPEG => "jpg",
        IMAGE_PNG => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => FALLBACK_EXTENSION,
    }
}
