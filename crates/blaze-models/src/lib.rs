//! Shared data models for Blaze Thumb.
//!
//! This crate provides Serde-serializable types for:
//! - Thumbnail size budgets
//! - Encoder ladder settings and attempt history
//! - Conversation keys and video descriptors
//! - Pairing entries awaiting a thumbnail

pub mod budget;
pub mod chat;
pub mod encoding;
pub mod pairing;
pub mod video;

// Re-export common types
pub use budget::SizeBudget;
pub use chat::{ChatId, ChatIdError};
pub use encoding::{EncodeAttempt, EncodePhase, ResolutionBound, TranscodeOutcome};
pub use pairing::{PairingEntry, PairingResolution};
pub use video::VideoDescriptor;
