//! Common types used across the back office

use serde::{Deserialize, Serialize};

/// Stored media file attached to a record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaReference {
    /// Object key in the blob store
    pub key: String,
    pub file_type: MediaType,
    pub url: String,
    pub original_filename: Option<String>,
    pub size_bytes: u64,
}

/// Types of media files
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaType::Image),
            "video" => Some(MediaType::Video),
            _ => None,
        }
    }

    /// Accepted file extensions for uploads of this type
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            MediaType::Image => &["png", "jpg", "jpeg", "webp"],
            MediaType::Video => &["mp4", "webm", "mov"],
        }
    }

    pub fn content_type_for(&self, extension: &str) -> &'static str {
        match (self, extension) {
            (MediaType::Image, "png") => "image/png",
            (MediaType::Image, "webp") => "image/webp",
            (MediaType::Image, _) => "image/jpeg",
            (MediaType::Video, "webm") => "video/webm",
            (MediaType::Video, "mov") => "video/quicktime",
            (MediaType::Video, _) => "video/mp4",
        }
    }
}
