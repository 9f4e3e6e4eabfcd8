//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

use blaze_models::EncodeAttempt;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while producing a thumbnail.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    #[error("Source image unreadable ({}): {reason}", .path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Could not produce a JPEG after {} attempts", .attempts.len())]
    EncodeFailure { attempts: Vec<EncodeAttempt> },

    #[error(
        "Thumbnail too large ({:.1} KB, cap {hard_cap_kb} KB) after {} attempts",
        kib(.size_bytes),
        .attempts.len()
    )]
    BudgetExceeded {
        size_bytes: u64,
        hard_cap_kb: u32,
        attempts: Vec<EncodeAttempt>,
        /// Smallest JPEG produced, for callers that can use an oversized one
        artifact: Vec<u8>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn kib(bytes: &u64) -> f64 {
    *bytes as f64 / 1024.0
}

impl MediaError {
    /// Create a source unreadable error.
    pub fn source_unreadable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Attempt history carried by the error, empty when there is none.
    pub fn attempts(&self) -> &[EncodeAttempt] {
        match self {
            MediaError::EncodeFailure { attempts } | MediaError::BudgetExceeded { attempts, .. } => {
                attempts
            }
            _ => &[],
        }
    }
}
