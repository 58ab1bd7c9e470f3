use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use flashdeck_core::model::{
    AnswerRecord, Card, DeckId, SessionError, SessionPhase, SessionStats, SessionSummary,
    StudySession,
};

use super::sync::StatsSync;
use crate::Clock;
use crate::card_store::CardStatsUpdate;

/// A running study session wired to statistics sync.
///
/// Mutation is synchronous; the only side effect of answering is a spawned
/// sync task that never blocks the advance. Handles of syncs still in flight
/// are kept so [`finish`](Self::finish) can wait for them.
pub struct ActiveSession {
    inner: StudySession,
    sync: StatsSync,
    clock: Clock,
    pending: Vec<JoinHandle<()>>,
}

impl ActiveSession {
    pub(crate) fn new(inner: StudySession, sync: StatsSync, clock: Clock) -> Self {
        Self {
            inner,
            sync,
            clock,
            pending: Vec::new(),
        }
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.inner.deck_id()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.phase()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.inner.cursor()
    }

    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.inner.total_cards()
    }

    #[must_use]
    pub fn flipped(&self) -> bool {
        self.inner.flipped()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }

    #[must_use]
    pub fn statistics(&self) -> SessionStats {
        self.inner.stats()
    }

    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        self.inner.current_card()
    }

    /// The fixed draw in session order.
    #[must_use]
    pub fn draw(&self) -> &[Card] {
        self.inner.draw()
    }

    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        self.inner.summary()
    }

    /// Show the back of the current card. Idempotent.
    pub fn reveal(&mut self) -> bool {
        self.inner.reveal()
    }

    /// Record the outcome for the flipped card, dispatch the new absolute
    /// statistics, and advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotRevealed` before `reveal` and
    /// `SessionError::Completed` after the last card.
    pub fn record_answer(&mut self, correct: bool) -> Result<AnswerRecord, SessionError> {
        let now = self.clock.now();
        let record = self.inner.record_answer(correct, now)?;
        self.pending.retain(|handle| !handle.is_finished());
        if let Some(handle) = self
            .sync
            .dispatch(record.card_id, CardStatsUpdate::new(&record.card_stats, now))
        {
            self.pending.push(handle);
        }

        debug!(
            deck_id = %self.deck_id(),
            card_id = %record.card_id,
            correct,
            "recorded answer"
        );
        if record.completed {
            let summary = self.summary();
            info!(
                deck_id = %summary.deck_id,
                studied = summary.stats.studied_cards(),
                accuracy = summary.accuracy,
                "session complete"
            );
        }
        Ok(record)
    }

    /// Study the same draw again from the first card. No fetch, no shuffle.
    pub fn restart(&mut self) {
        self.inner.restart();
        debug!(deck_id = %self.deck_id(), "session restarted");
    }

    /// Syncs dispatched but not yet finished.
    #[must_use]
    pub fn pending_syncs(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Finish the session, returning the final summary. Its `deck_id` names
    /// the deck whose cards now carry updated statistics.
    ///
    /// Syncs still in flight keep running detached; use
    /// [`finish`](Self::finish) when the runtime is about to shut down.
    #[must_use]
    pub fn end(self) -> SessionSummary {
        self.inner.summary()
    }

    /// Like [`end`](Self::end), but first waits up to `wait` for pending
    /// syncs. Whatever is still running at the deadline is left detached.
    pub async fn finish(self, wait: Duration) -> SessionSummary {
        let deadline = Instant::now() + wait;
        let total = self.pending.len();
        let mut drained = 0;
        for handle in self.pending {
            if timeout_at(deadline, handle).await.is_err() {
                warn!(
                    deck_id = %self.inner.deck_id(),
                    unfinished = total - drained,
                    "gave up waiting for card stats sync"
                );
                break;
            }
            drained += 1;
        }
        debug!(deck_id = %self.inner.deck_id(), drained, "session finished");
        self.inner.summary()
    }
}
