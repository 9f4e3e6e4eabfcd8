//! Structured pairing logs.
//!
//! Every lifecycle event of a pairing is logged with the chat and the entry
//! generation, so a single pairing can be followed across start, claim,
//! cancel and expiry.

use tracing::{debug, info};

use blaze_models::{ChatId, PairingResolution};

/// Logger bound to one pairing.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    chat_id: ChatId,
    generation: u64,
}

impl SessionLogger {
    pub fn new(chat_id: ChatId, generation: u64) -> Self {
        Self {
            chat_id,
            generation,
        }
    }

    /// Log a new pairing.
    pub fn log_start(&self, file_id: &str, ttl_secs: u64) {
        info!(
            chat_id = %self.chat_id,
            generation = self.generation,
            file_id = %file_id,
            ttl_secs,
            "Pairing started: waiting for thumbnail"
        );
    }

    /// Log a start rejected because a pairing is already waiting.
    pub fn log_conflict(&self) {
        debug!(
            chat_id = %self.chat_id,
            generation = self.generation,
            "Pairing rejected: video already waiting"
        );
    }

    /// Log how the pairing ended.
    pub fn log_resolution(&self, resolution: PairingResolution) {
        info!(
            chat_id = %self.chat_id,
            generation = self.generation,
            resolution = %resolution,
            "Pairing resolved: {}", resolution
        );
    }
}
