//! Application state.

use std::sync::Arc;

use blaze_media::{ImageEncoder, TranscodeEngine};
use blaze_session::{ExpiryNotifier, PairingStore};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pairings: PairingStore,
    pub engine: TranscodeEngine,
}

impl AppState {
    /// Create new application state.
    ///
    /// Pairings that expire unclaimed are handed to `notifier`.
    pub fn new(
        config: ApiConfig,
        encoder: Arc<dyn ImageEncoder>,
        notifier: impl ExpiryNotifier + 'static,
    ) -> Self {
        let pairings = PairingStore::new(config.session, notifier);

        let engine = TranscodeEngine::new(encoder);
        let engine = match &config.work_dir {
            Some(dir) => engine.with_work_dir(dir),
            None => engine,
        };

        Self {
            config,
            pairings,
            engine,
        }
    }
}
