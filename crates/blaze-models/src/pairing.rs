//! Pairing models.
//!
//! A pairing is the transient association between one conversation and one
//! video that is waiting for its thumbnail.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::chat::ChatId;
use crate::video::VideoDescriptor;

/// A video awaiting its thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PairingEntry {
    /// Conversation the pairing belongs to
    pub key: ChatId,
    /// Video to resend once the thumbnail arrives
    pub media: VideoDescriptor,
    /// When the pairing was started
    pub created_at: DateTime<Utc>,
    /// When the pairing expires if unclaimed
    pub expires_at: DateTime<Utc>,
    /// Distinguishes this entry from any later entry under the same key
    pub generation: u64,
}

/// How a pairing left the awaiting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PairingResolution {
    /// A thumbnail claimed the video
    Paired,
    /// The caller cancelled explicitly
    Cancelled,
    /// The TTL elapsed first
    Expired,
}

impl PairingResolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            PairingResolution::Paired => "paired",
            PairingResolution::Cancelled => "cancelled",
            PairingResolution::Expired => "expired",
        }
    }
}

impl fmt::Display for PairingResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
