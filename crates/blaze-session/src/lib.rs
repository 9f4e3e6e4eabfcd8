//! Pairing store for Blaze Thumb.
//!
//! A chat sends a video, then a cover image. Between the two the video waits
//! here, keyed by chat, until it is claimed, cancelled, or its TTL elapses.
//!
//! - [`PairingStore`]: concurrent per-chat store
//! - [`ExpiryNotifier`]: receives pairings that expired unclaimed
//! - [`SessionConfig`]: TTL configuration

pub mod config;
pub mod error;
pub mod expiry;
pub mod logging;
pub mod store;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use expiry::{ExpiredPairing, ExpiryNotifier, NoopNotifier};
pub use logging::SessionLogger;
pub use store::PairingStore;

/// Metric names.
pub mod names {
    pub const PAIRINGS_TOTAL: &str = "blaze_pairings_total";
    pub const PAIRINGS_STARTED_TOTAL: &str = "blaze_pairings_started_total";
}
