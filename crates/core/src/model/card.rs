use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    difficulty::Difficulty,
    ids::{CardId, DeckId, UserId},
    stats::{CardStats, StatsError},
    tag::{TagError, TagSet},
};

/// Longest front or back text accepted, in characters.
pub const MAX_CARD_TEXT_LEN: usize = 500;

//
// ─── CARD ERRORS ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CardError {
    #[error("card front cannot be empty")]
    EmptyFront,

    #[error("card front exceeds {MAX_CARD_TEXT_LEN} characters: {len}")]
    FrontTooLong { len: usize },

    #[error("card back cannot be empty")]
    EmptyBack,

    #[error("card back exceeds {MAX_CARD_TEXT_LEN} characters: {len}")]
    BackTooLong { len: usize },

    #[error(transparent)]
    Tags(#[from] TagError),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

fn validate_side(
    raw: &str,
    empty: CardError,
    too_long: fn(usize) -> CardError,
) -> Result<String, CardError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(empty);
    }
    let len = trimmed.chars().count();
    if len > MAX_CARD_TEXT_LEN {
        return Err(too_long(len));
    }
    Ok(trimmed.to_owned())
}

//
// ─── CARD TYPES ────────────────────────────────────────────────────────────────
//

/// Unvalidated card input, as it arrives from a form or request body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardDraft {
    pub front: String,
    pub back: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
}

impl CardDraft {
    #[must_use]
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            difficulty: Difficulty::default(),
            tags: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Validate text limits and tags.
    ///
    /// # Errors
    ///
    /// Returns `CardError` for blank or oversize sides and invalid tags.
    pub fn validate(self) -> Result<ValidatedCard, CardError> {
        let front = validate_side(&self.front, CardError::EmptyFront, |len| {
            CardError::FrontTooLong { len }
        })?;
        let back = validate_side(&self.back, CardError::EmptyBack, |len| {
            CardError::BackTooLong { len }
        })?;
        let tags = TagSet::parse(self.tags)?;
        Ok(ValidatedCard {
            front,
            back,
            difficulty: self.difficulty,
            tags,
        })
    }
}

/// Card content that passed validation but has no identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCard {
    front: String,
    back: String,
    difficulty: Difficulty,
    tags: TagSet,
}

impl ValidatedCard {
    #[must_use]
    pub fn front(&self) -> &str {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &str {
        &self.back
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Attach identity and ownership, producing a fresh card with zeroed stats.
    #[must_use]
    pub fn assign_id(
        self,
        id: CardId,
        deck_id: DeckId,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Card {
        Card {
            id,
            deck_id,
            owner_id,
            front: self.front,
            back: self.back,
            difficulty: self.difficulty,
            tags: self.tags,
            stats: CardStats::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    id: CardId,
    deck_id: DeckId,
    owner_id: UserId,
    front: String,
    back: String,
    difficulty: Difficulty,
    tags: TagSet,
    stats: CardStats,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Card {
    /// Rehydrate a card from storage, re-checking text limits.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if the persisted front/back would not pass validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: CardId,
        deck_id: DeckId,
        owner_id: UserId,
        front: String,
        back: String,
        difficulty: Difficulty,
        tags: TagSet,
        stats: CardStats,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, CardError> {
        let content = CardDraft {
            front,
            back,
            difficulty,
            tags: Vec::new(),
        }
        .validate()?;
        Ok(Self {
            id,
            deck_id,
            owner_id,
            front: content.front,
            back: content.back,
            difficulty,
            tags,
            stats,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> CardId {
        self.id
    }

    #[must_use]
    pub fn deck_id(&self) -> DeckId {
        self.deck_id
    }

    #[must_use]
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    #[must_use]
    pub fn front(&self) -> &str {
        &self.front
    }

    #[must_use]
    pub fn back(&self) -> &str {
        &self.back
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    #[must_use]
    pub fn stats(&self) -> &CardStats {
        &self.stats
    }

    /// Percentage of correct answers over all study attempts.
    #[must_use]
    pub fn accuracy(&self) -> u32 {
        self.stats.accuracy()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replace front/back/difficulty/tags, keeping identity and statistics.
    pub fn apply_edit(&mut self, content: ValidatedCard, now: DateTime<Utc>) {
        self.front = content.front;
        self.back = content.back;
        self.difficulty = content.difficulty;
        self.tags = content.tags;
        self.updated_at = now;
    }

    /// Overwrite the cumulative statistics.
    pub fn set_stats(&mut self, stats: CardStats, now: DateTime<Utc>) {
        self.stats = stats;
        self.updated_at = now;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn card_fails_if_front_blank() {
        let err = CardDraft::new("   ", "ok").validate().unwrap_err();
        assert_eq!(err, CardError::EmptyFront);
    }

    #[test]
    fn card_fails_if_back_blank() {
        let err = CardDraft::new("ok", "").validate().unwrap_err();
        assert_eq!(err, CardError::EmptyBack);
    }

    #[test]
    fn card_text_limit_counts_chars_not_bytes() {
        let front = "ü".repeat(MAX_CARD_TEXT_LEN);
        assert!(CardDraft::new(front, "ok").validate().is_ok());

        let err = CardDraft::new("ok", "b".repeat(501)).validate().unwrap_err();
        assert_eq!(err, CardError::BackTooLong { len: 501 });
    }

    #[test]
    fn card_rejects_too_many_tags() {
        let err = CardDraft::new("q", "a")
            .with_tags(["1", "2", "3", "4", "5", "6"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, CardError::Tags(TagError::TooMany { count: 6 })));
    }

    #[test]
    fn valid_card_gets_identity_and_zero_stats() {
        let card = CardDraft::new(" hola ", "hello")
            .with_difficulty(Difficulty::Hard)
            .with_tags(["spanish"])
            .validate()
            .unwrap()
            .assign_id(CardId::new(42), DeckId::new(1), UserId::new(7), fixed_now());

        assert_eq!(card.id(), CardId::new(42));
        assert_eq!(card.front(), "hola");
        assert_eq!(card.difficulty(), Difficulty::Hard);
        assert_eq!(card.stats().study_count(), 0);
        assert_eq!(card.accuracy(), 0);
        assert!(card.tags().contains("spanish"));
    }

    #[test]
    fn edit_keeps_stats() {
        let mut card = CardDraft::new("q", "a")
            .validate()
            .unwrap()
            .assign_id(CardId::new(1), DeckId::new(1), UserId::new(1), fixed_now());
        card.set_stats(CardStats::new(4, 3, Some(fixed_now())).unwrap(), fixed_now());

        let edit = CardDraft::new("q2", "a2").validate().unwrap();
        card.apply_edit(edit, fixed_now());

        assert_eq!(card.front(), "q2");
        assert_eq!(card.accuracy(), 75);
    }
}
