//! Pairing configuration.

use std::time::Duration;

/// Default time a video waits for its thumbnail.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(120);
/// Longest accepted TTL.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Pairing store configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a pairing stays claimable
    pub ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl SessionConfig {
    /// Create a config, clamping the TTL to [`MAX_SESSION_TTL`].
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(MAX_SESSION_TTL),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let ttl = std::env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_SESSION_TTL);
        Self::new(ttl)
    }
}
