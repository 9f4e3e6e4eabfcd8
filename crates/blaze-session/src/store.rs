//! Concurrent per-chat pairing store.
//!
//! Each chat holds at most one pairing. Operations on one chat are
//! linearized by the map's shard lock; different chats never contend on a
//! store-wide lock. Every entry is resolved exactly once: by `claim`, by
//! `cancel`, or by expiry, whichever comes first.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use metrics::counter;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use blaze_models::{ChatId, PairingEntry, PairingResolution, VideoDescriptor};

use crate::config::{SessionConfig, MAX_SESSION_TTL};
use crate::error::{SessionError, SessionResult};
use crate::expiry::{ExpiredPairing, ExpiryNotifier, ExpiryScheduler};
use crate::logging::SessionLogger;
use crate::names;

/// A stored pairing with its deadline and timer.
struct Slot {
    entry: PairingEntry,
    deadline: Instant,
    timer: CancellationToken,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        now < self.deadline
    }
}

struct StoreInner {
    slots: DashMap<ChatId, Slot>,
    ttl: Duration,
    next_generation: AtomicU64,
    scheduler: ExpiryScheduler,
    notifier: Box<dyn ExpiryNotifier>,
}

impl StoreInner {
    /// Timer callback: remove the entry only if it is still the one the
    /// timer was armed for.
    fn expire(&self, key: ChatId, generation: u64) {
        let removed = self
            .slots
            .remove_if(&key, |_, slot| slot.entry.generation == generation);

        if let Some((_, slot)) = removed {
            self.notify_expired(slot.entry);
        }
    }

    fn notify_expired(&self, entry: PairingEntry) {
        record_resolution(&entry, PairingResolution::Expired);
        self.notifier.notify(ExpiredPairing {
            key: entry.key,
            media: entry.media,
            generation: entry.generation,
            expired_at: Utc::now(),
        });
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.scheduler.shutdown();
    }
}

fn record_resolution(entry: &PairingEntry, resolution: PairingResolution) {
    SessionLogger::new(entry.key, entry.generation).log_resolution(resolution);
    counter!(names::PAIRINGS_TOTAL, "resolution" => resolution.as_str()).increment(1);
}

fn wall_clock_deadline(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Videos waiting for their thumbnail, keyed by chat.
///
/// Cloning is cheap; clones share the same entries. Timers are disarmed when
/// the last clone is dropped.
#[derive(Clone)]
pub struct PairingStore {
    inner: Arc<StoreInner>,
}

impl fmt::Debug for PairingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingStore")
            .field("pending", &self.inner.slots.len())
            .field("ttl", &self.inner.ttl)
            .finish()
    }
}

impl PairingStore {
    /// Create a store. Expired pairings are reported to `notifier`.
    ///
    /// The TTL is clamped to [`MAX_SESSION_TTL`] even when `config` was built
    /// without [`SessionConfig::new`].
    pub fn new(config: SessionConfig, notifier: impl ExpiryNotifier + 'static) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                slots: DashMap::new(),
                ttl: config.ttl.min(MAX_SESSION_TTL),
                next_generation: AtomicU64::new(0),
                scheduler: ExpiryScheduler::new(),
                notifier: Box::new(notifier),
            }),
        }
    }

    /// Register `media` as waiting for a thumbnail in chat `key`.
    ///
    /// Fails with [`SessionError::Conflict`] while another pairing for the
    /// chat is live. A pairing past its deadline whose timer has not fired
    /// yet is expired here, with its notification, and replaced.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, key: ChatId, media: VideoDescriptor) -> SessionResult<PairingEntry> {
        let now = Instant::now();
        let created_at = Utc::now();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed) + 1;

        let entry = PairingEntry {
            key,
            media,
            created_at,
            expires_at: wall_clock_deadline(created_at, self.inner.ttl),
            generation,
        };
        let deadline = now + self.inner.ttl;
        let timer = self.inner.scheduler.token();
        let slot = Slot {
            entry: entry.clone(),
            deadline,
            timer: timer.clone(),
        };

        let stale = match self.inner.slots.entry(key) {
            Entry::Occupied(occupied) if occupied.get().is_live(now) => {
                SessionLogger::new(key, occupied.get().entry.generation).log_conflict();
                return Err(SessionError::Conflict(key));
            }
            Entry::Occupied(mut occupied) => Some(occupied.insert(slot)),
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                None
            }
        };

        if let Some(stale) = stale {
            stale.timer.cancel();
            self.inner.notify_expired(stale.entry);
        }

        let inner: Weak<StoreInner> = Arc::downgrade(&self.inner);
        self.inner.scheduler.schedule(timer, deadline, move || {
            if let Some(inner) = inner.upgrade() {
                inner.expire(key, generation);
            }
        });

        SessionLogger::new(key, generation)
            .log_start(&entry.media.file_id, self.inner.ttl.as_secs());
        counter!(names::PAIRINGS_STARTED_TOTAL).increment(1);

        Ok(entry)
    }

    /// Take the waiting video for chat `key`.
    ///
    /// The entry is removed atomically; of two concurrent claims exactly one
    /// succeeds. An entry found past its deadline is expired instead and the
    /// claim fails with [`SessionError::NotFound`].
    pub fn claim(&self, key: ChatId) -> SessionResult<VideoDescriptor> {
        let slot = self.take(key)?;
        record_resolution(&slot.entry, PairingResolution::Paired);
        Ok(slot.entry.media)
    }

    /// Drop the waiting video for chat `key` and disarm its timer.
    pub fn cancel(&self, key: ChatId) -> SessionResult<()> {
        let slot = self.take(key)?;
        record_resolution(&slot.entry, PairingResolution::Cancelled);
        Ok(())
    }

    /// The live pairing for chat `key`, if any.
    pub fn get(&self, key: ChatId) -> Option<PairingEntry> {
        let now = Instant::now();
        self.inner
            .slots
            .get(&key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.entry.clone())
    }

    /// Number of stored pairings, including ones past their deadline whose
    /// timer has not fired yet.
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Disarm every expiry timer. Entries stay in place and are expired
    /// lazily by the next operation on their chat.
    pub fn shutdown(&self) {
        self.inner.scheduler.shutdown();
    }

    /// Remove the live entry for `key`, expiring it if its deadline passed.
    fn take(&self, key: ChatId) -> SessionResult<Slot> {
        let now = Instant::now();
        let (_, slot) = self
            .inner
            .slots
            .remove(&key)
            .ok_or(SessionError::NotFound(key))?;
        slot.timer.cancel();

        if !slot.is_live(now) {
            self.inner.notify_expired(slot.entry);
            return Err(SessionError::NotFound(key));
        }
        Ok(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::NoopNotifier;
    use tokio_test::{assert_err, assert_ok};

    fn store() -> PairingStore {
        PairingStore::new(SessionConfig::default(), NoopNotifier)
    }

    fn video(file_id: &str) -> VideoDescriptor {
        VideoDescriptor::new(file_id).with_dimensions(1920, 1080)
    }

    #[tokio::test]
    async fn test_start_then_claim() {
        let store = store();
        let entry = assert_ok!(store.start(ChatId(1), video("abc")));

        assert_eq!(entry.key, ChatId(1));
        assert_eq!((entry.expires_at - entry.created_at).num_seconds(), 120);
        assert_eq!(store.get(ChatId(1)), Some(entry));
        assert_eq!(store.len(), 1);

        let media = assert_ok!(store.claim(ChatId(1)));
        assert_eq!(media, video("abc"));
        assert!(store.is_empty());
        assert_eq!(store.get(ChatId(1)), None);
    }

    #[tokio::test]
    async fn test_second_start_conflicts() {
        let store = store();
        store.start(ChatId(1), video("first")).unwrap();

        let err = store.start(ChatId(1), video("second")).unwrap_err();
        assert_eq!(err, SessionError::Conflict(ChatId(1)));

        // The original pairing is untouched
        assert_eq!(store.claim(ChatId(1)).unwrap().file_id, "first");
    }

    #[tokio::test]
    async fn test_chats_are_independent() {
        let store = store();
        store.start(ChatId(1), video("one")).unwrap();
        store.start(ChatId(2), video("two")).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.claim(ChatId(2)).unwrap().file_id, "two");
        assert_eq!(store.claim(ChatId(1)).unwrap().file_id, "one");
    }

    #[tokio::test]
    async fn test_claim_without_pairing() {
        let store = store();
        assert_eq!(
            store.claim(ChatId(3)).unwrap_err(),
            SessionError::NotFound(ChatId(3))
        );
    }

    #[tokio::test]
    async fn test_claim_is_consumed_once() {
        let store = store();
        store.start(ChatId(1), video("abc")).unwrap();
        store.claim(ChatId(1)).unwrap();
        assert!(matches!(
            store.claim(ChatId(1)),
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel() {
        let store = store();
        store.start(ChatId(1), video("abc")).unwrap();

        assert_ok!(store.cancel(ChatId(1)));
        assert!(store.is_empty());
        assert_eq!(
            store.cancel(ChatId(1)).unwrap_err(),
            SessionError::NotFound(ChatId(1))
        );
        assert_err!(store.claim(ChatId(1)));
    }

    #[tokio::test]
    async fn test_restart_after_resolution_gets_new_generation() {
        let store = store();
        let first = store.start(ChatId(1), video("a")).unwrap();
        store.claim(ChatId(1)).unwrap();
        let second = store.start(ChatId(1), video("b")).unwrap();

        assert!(second.generation > first.generation);
    }

    #[tokio::test]
    async fn test_unclamped_ttl_is_capped() {
        let store = PairingStore::new(SessionConfig { ttl: Duration::MAX }, NoopNotifier);
        let entry = assert_ok!(store.start(ChatId(1), video("abc")));

        assert_eq!(
            (entry.expires_at - entry.created_at).num_seconds(),
            MAX_SESSION_TTL.as_secs() as i64
        );
        assert_ok!(store.claim(ChatId(1)));
    }

    #[tokio::test]
    async fn test_debug_output() {
        let store = store();
        store.start(ChatId(1), video("a")).unwrap();
        assert!(format!("{:?}", store).contains("pending: 1"));
    }
}
