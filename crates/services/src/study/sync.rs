use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use flashdeck_core::model::CardId;

use crate::card_store::{CardStatsUpdate, CardStore};

/// Fire-and-forget statistics persistence.
///
/// Each dispatch runs on its own task; failures are logged and dropped.
#[derive(Clone)]
pub struct StatsSync {
    store: Arc<dyn CardStore>,
}

impl StatsSync {
    #[must_use]
    pub fn new(store: Arc<dyn CardStore>) -> Self {
        Self { store }
    }

    /// Spawn the update and return immediately.
    ///
    /// Returns the task handle for callers that want to observe completion,
    /// or `None` when no tokio runtime is available.
    pub fn dispatch(&self, card_id: CardId, update: CardStatsUpdate) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            warn!(card_id = %card_id, "no async runtime; dropping stats update");
            return None;
        };
        let store = Arc::clone(&self.store);
        Some(runtime.spawn(async move {
            match store.update_card_stats(card_id, update).await {
                Ok(()) => debug!(
                    card_id = %card_id,
                    study_count = update.study_count,
                    correct_count = update.correct_count,
                    "synced card stats"
                ),
                Err(err) => warn!(card_id = %card_id, error = %err, "card stats sync failed"),
            }
        }))
    }
}
