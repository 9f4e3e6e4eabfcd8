//! Background service draining pairing expiry notifications.
//!
//! The pairing store reports every video that timed out before its
//! thumbnail arrived. This service logs and counts them, and keeps the
//! pending pairings gauge in step with timer-driven removals.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use blaze_session::{ExpiredPairing, PairingStore};

use crate::metrics;

/// Expiry notification listener.
pub struct ExpiryListener {
    receiver: UnboundedReceiver<ExpiredPairing>,
    pairings: PairingStore,
}

impl ExpiryListener {
    pub fn new(receiver: UnboundedReceiver<ExpiredPairing>, pairings: PairingStore) -> Self {
        Self { receiver, pairings }
    }

    /// Run until every sender is gone, returning how many notifications
    /// were handled.
    ///
    /// This function should be spawned as a background task. When the
    /// sender lives inside `pairings` it runs for the life of the store.
    pub async fn run(mut self) -> usize {
        info!("Starting pairing expiry listener");

        let mut handled = 0;
        while let Some(expired) = self.receiver.recv().await {
            self.handle(&expired);
            handled += 1;
        }

        info!(handled, "Pairing expiry listener stopped");
        handled
    }

    fn handle(&self, expired: &ExpiredPairing) {
        info!(
            chat_id = %expired.key,
            generation = expired.generation,
            file_id = %expired.media.file_id,
            "Time expired: video dropped before a thumbnail arrived"
        );
        metrics::record_expiry_notification();
        // The entry is already gone when its notification is sent
        metrics::set_pending_pairings(self.pairings.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaze_models::{ChatId, VideoDescriptor};
    use blaze_session::{NoopNotifier, SessionConfig};
    use chrono::Utc;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::time::Duration;

    #[tokio::test]
    async fn test_drains_until_senders_close() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let pairings = PairingStore::new(SessionConfig::default(), NoopNotifier);
        let listener = tokio::spawn(ExpiryListener::new(rx, pairings).run());

        for key in 0..3 {
            tx.send(ExpiredPairing {
                key: ChatId(key),
                media: VideoDescriptor::new("file"),
                generation: 1,
                expired_at: Utc::now(),
            })
            .unwrap();
        }
        drop(tx);

        assert_eq!(listener.await.unwrap(), 3);
    }

    #[test]
    fn test_timer_expiry_refreshes_pending_gauge() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        ::metrics::with_local_recorder(&recorder, || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();

            runtime.block_on(async {
                let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
                let pairings = PairingStore::new(SessionConfig::new(Duration::from_millis(50)), tx);
                tokio::spawn(ExpiryListener::new(rx, pairings.clone()).run());

                pairings.start(ChatId(1), VideoDescriptor::new("a")).unwrap();
                pairings.start(ChatId(2), VideoDescriptor::new("b")).unwrap();
                metrics::set_pending_pairings(pairings.len());

                tokio::time::sleep(Duration::from_millis(300)).await;
                assert!(pairings.is_empty());
            });
        });

        let rendered = handle.render();
        assert!(rendered.contains("blaze_pairings_pending 0"), "{}", rendered);
    }
}
