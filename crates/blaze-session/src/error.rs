//! Error types for the pairing store.

use blaze_models::ChatId;
use thiserror::Error;

/// Result type for pairing operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Pairing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Chat {0} already has a video waiting for its thumbnail")]
    Conflict(ChatId),

    #[error("Chat {0} has no video waiting for a thumbnail")]
    NotFound(ChatId),
}
