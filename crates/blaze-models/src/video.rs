//! Video descriptors.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A video already stored on the messaging platform.
///
/// The descriptor is opaque to the pairing and transcode logic and is handed
/// back untouched so the sender can reuse `file_id` instead of re-uploading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VideoDescriptor {
    /// Platform storage reference
    pub file_id: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration_secs: u32,
    /// Width in pixels
    #[serde(default)]
    pub width: u32,
    /// Height in pixels
    #[serde(default)]
    pub height: u32,
    /// Original caption
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Resend as a streamable video
    #[serde(default = "default_supports_streaming")]
    pub supports_streaming: bool,
}

fn default_supports_streaming() -> bool {
    true
}

impl VideoDescriptor {
    /// Create a descriptor with only a storage reference.
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            duration_secs: 0,
            width: 0,
            height: 0,
            caption: None,
            supports_streaming: true,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_duration(mut self, duration_secs: u32) -> Self {
        self.duration_secs = duration_secs;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }
}
