//! Expiry timers and notifications.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use blaze_models::{ChatId, VideoDescriptor};

/// A pairing whose TTL elapsed before it was claimed or cancelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredPairing {
    pub key: ChatId,
    pub media: VideoDescriptor,
    pub generation: u64,
    pub expired_at: DateTime<Utc>,
}

/// Receives expired pairings.
///
/// Called once per expired entry, from the timer task or from the store
/// operation that found the entry past its deadline. Implementations must
/// not block.
pub trait ExpiryNotifier: Send + Sync {
    fn notify(&self, expired: ExpiredPairing);
}

impl ExpiryNotifier for UnboundedSender<ExpiredPairing> {
    fn notify(&self, expired: ExpiredPairing) {
        if let Err(e) = self.send(expired) {
            debug!(chat_id = %e.0.key, "Expiry receiver closed, dropping notification");
        }
    }
}

/// Discards notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ExpiryNotifier for NoopNotifier {
    fn notify(&self, _expired: ExpiredPairing) {}
}

/// Spawns one-shot expiry timers.
///
/// Every timer is a child of the scheduler's own token, so
/// [`ExpiryScheduler::shutdown`] disarms all of them at once.
#[derive(Debug, Clone, Default)]
pub struct ExpiryScheduler {
    shutdown: CancellationToken,
}

impl ExpiryScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh timer token, disarmed by [`ExpiryScheduler::shutdown`].
    pub fn token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }

    /// Run `on_fire` at `deadline` unless `token` is cancelled first.
    ///
    /// A token cancelled before this call disarms the timer immediately.
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, token: CancellationToken, deadline: Instant, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => on_fire(),
            }
        });
    }

    /// Disarm every pending timer.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
