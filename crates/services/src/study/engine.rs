use std::sync::Arc;

use rand::Rng;
use tracing::info;

use flashdeck_core::model::{Card, DeckId, DifficultyFilter, StudySession};

use super::session::ActiveSession;
use super::shuffle::fisher_yates;
use super::sync::StatsSync;
use crate::Clock;
use crate::card_store::CardStore;
use crate::error::StartSessionError;

/// Builds study sessions from a card store.
#[derive(Clone)]
pub struct StudyEngine {
    clock: Clock,
    store: Arc<dyn CardStore>,
    sync: StatsSync,
}

impl StudyEngine {
    #[must_use]
    pub fn new(clock: Clock, store: Arc<dyn CardStore>) -> Self {
        let sync = StatsSync::new(Arc::clone(&store));
        Self { clock, store, sync }
    }

    /// Fetch the deck's cards once, shuffle them, and start a session.
    ///
    /// # Errors
    ///
    /// Returns `StartSessionError::Fetch` if the store fails and
    /// `StartSessionError::EmptySet` if no card matches the filter.
    pub async fn start_session(
        &self,
        deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<ActiveSession, StartSessionError> {
        let cards = self.fetch(deck_id, filter).await?;
        self.begin(deck_id, cards, &mut rand::rng())
    }

    /// Like [`start_session`](Self::start_session) with a caller-supplied RNG.
    ///
    /// # Errors
    ///
    /// Same as `start_session`.
    pub async fn start_session_with_rng<R: Rng + ?Sized>(
        &self,
        deck_id: DeckId,
        filter: DifficultyFilter,
        rng: &mut R,
    ) -> Result<ActiveSession, StartSessionError> {
        let cards = self.fetch(deck_id, filter).await?;
        self.begin(deck_id, cards, rng)
    }

    async fn fetch(
        &self,
        deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<Vec<Card>, StartSessionError> {
        let cards = self.store.list_cards(deck_id, filter).await?;
        if cards.is_empty() {
            return Err(StartSessionError::EmptySet { deck_id });
        }
        Ok(cards)
    }

    fn begin<R: Rng + ?Sized>(
        &self,
        deck_id: DeckId,
        mut cards: Vec<Card>,
        rng: &mut R,
    ) -> Result<ActiveSession, StartSessionError> {
        fisher_yates(&mut cards, rng);
        let total = cards.len();
        let session =
            StudySession::new(deck_id, cards).map_err(|_| StartSessionError::EmptySet { deck_id })?;
        info!(deck_id = %deck_id, total, "study session started");
        Ok(ActiveSession::new(session, self.sync.clone(), self.clock))
    }
}
