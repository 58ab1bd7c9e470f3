use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::{Card, CardId, CardStats, DeckId, stats::accuracy_percent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no cards available for session")]
    Empty,

    #[error("card must be revealed before answering")]
    NotRevealed,

    #[error("session already completed")]
    Completed,
}

/// Where the session is in the per-card flip/answer/advance cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Front of the current card only.
    Showing,
    /// Front and back visible; answering is allowed.
    Flipped,
    /// Every card in the draw has been answered.
    Complete,
}

/// Counters for one pass over the draw.
///
/// `studied_cards == correct_answers + incorrect_answers` and
/// `studied_cards <= total_cards` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    total_cards: u32,
    studied_cards: u32,
    correct_answers: u32,
    incorrect_answers: u32,
}

impl SessionStats {
    fn for_total(total_cards: u32) -> Self {
        Self {
            total_cards,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn total_cards(&self) -> u32 {
        self.total_cards
    }

    #[must_use]
    pub fn studied_cards(&self) -> u32 {
        self.studied_cards
    }

    #[must_use]
    pub fn correct_answers(&self) -> u32 {
        self.correct_answers
    }

    #[must_use]
    pub fn incorrect_answers(&self) -> u32 {
        self.incorrect_answers
    }

    /// Session accuracy in whole percent, 0 before any answer.
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        accuracy_percent(self.correct_answers, self.studied_cards)
    }
}

/// What happened when an answer was recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub card_id: CardId,
    pub correct: bool,
    /// Absolute cumulative statistics the card should now carry.
    pub card_stats: CardStats,
    /// True when this answer exhausted the draw.
    pub completed: bool,
}

/// Final (or interim) report for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub deck_id: DeckId,
    #[serde(flatten)]
    pub stats: SessionStats,
    pub accuracy: u32,
}

/// In-memory study session over a fixed, already ordered draw.
///
/// Owns its cards exclusively; the only state that outlives it is whatever
/// the caller persists from the returned [`AnswerRecord`]s.
#[derive(Debug, Clone)]
pub struct StudySession {
    deck_id: DeckId,
    draw: Vec<Card>,
    cursor: usize,
    flipped: bool,
    complete: bool,
    stats: SessionStats,
}

impl StudySession {
    /// Start a session over `draw` in the given order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when `draw` has no cards.
    pub fn new(deck_id: DeckId, draw: Vec<Card>) -> Result<Self, SessionError> {
        if draw.is_empty() {
            return Err(SessionError::Empty);
        }
        let total = u32::try_from(draw.len()).unwrap_or(u32::MAX);
        Ok(Self {
            deck_id,
            draw,
            cursor: 0,
            flipped: false,
            complete: false,
            stats: SessionStats::for_total(total),
        })
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.complete {
            SessionPhase::Complete
        } else if self.flipped {
            SessionPhase::Flipped
        } else {
            SessionPhase::Showing
        }
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.draw.len()
    }

    #[must_use]
    pub fn flipped(&self) -> bool {
        self.flipped
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// The draw in session order.
    #[must_use]
    pub fn draw(&self) -> &[Card] {
        &self.draw
    }

    /// Card under the cursor, or `None` once complete.
    #[must_use]
    pub fn current_card(&self) -> Option<&Card> {
        if self.complete {
            return None;
        }
        self.draw.get(self.cursor)
    }

    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            deck_id: self.deck_id,
            stats: self.stats,
            accuracy: self.stats.accuracy(),
        }
    }

    /// Show the back of the current card.
    ///
    /// Returns `true` only on the `Showing -> Flipped` transition; repeated
    /// calls and calls after completion change nothing.
    pub fn reveal(&mut self) -> bool {
        if self.complete || self.flipped {
            return false;
        }
        self.flipped = true;
        true
    }

    /// Record the outcome for the flipped card and advance.
    ///
    /// The current card's in-memory statistics are replaced with the
    /// post-answer absolute values, which are also returned for persisting.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` after the last card and
    /// `SessionError::NotRevealed` if the card is still face down.
    pub fn record_answer(
        &mut self,
        correct: bool,
        at: DateTime<Utc>,
    ) -> Result<AnswerRecord, SessionError> {
        if self.complete {
            return Err(SessionError::Completed);
        }
        if !self.flipped {
            return Err(SessionError::NotRevealed);
        }
        let card = self
            .draw
            .get_mut(self.cursor)
            .ok_or(SessionError::Completed)?;

        let card_stats = card.stats().after_answer(correct, at);
        card.set_stats(card_stats, at);
        let card_id = card.id();

        self.stats.studied_cards += 1;
        if correct {
            self.stats.correct_answers += 1;
        } else {
            self.stats.incorrect_answers += 1;
        }

        if self.cursor + 1 < self.draw.len() {
            self.cursor += 1;
            self.flipped = false;
        } else {
            self.complete = true;
            self.flipped = false;
        }

        Ok(AnswerRecord {
            card_id,
            correct,
            card_stats,
            completed: self.complete,
        })
    }

    /// Go back to the first card with zeroed counters, keeping the draw order.
    pub fn restart(&mut self) {
        self.cursor = 0;
        self.flipped = false;
        self.complete = false;
        self.stats = SessionStats::for_total(self.stats.total_cards);
    }
}
