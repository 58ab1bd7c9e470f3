use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{DeckId, UserId};
use crate::model::tag::{TagError, TagSet};

/// Longest deck name accepted, in characters.
pub const MAX_DECK_NAME_LEN: usize = 100;

/// Longest deck description accepted, in characters.
pub const MAX_DECK_DESCRIPTION_LEN: usize = 500;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeckError {
    #[error("deck name cannot be empty")]
    EmptyName,

    #[error("deck name exceeds {MAX_DECK_NAME_LEN} characters: {len}")]
    NameTooLong { len: usize },

    #[error("deck description exceeds {MAX_DECK_DESCRIPTION_LEN} characters: {len}")]
    DescriptionTooLong { len: usize },

    #[error("invalid visibility: {0}")]
    InvalidVisibility(String),

    #[error(transparent)]
    Tags(#[from] TagError),
}

//
// ─── VISIBILITY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    #[must_use]
    pub fn is_public(self) -> bool {
        matches!(self, Visibility::Public)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(DeckError::InvalidVisibility(s.to_owned())),
        }
    }
}

//
// ─── DECK ──────────────────────────────────────────────────────────────────────
//

/// Unvalidated deck input.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeckDraft {
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub tags: Vec<String>,
}

impl DeckDraft {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
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
}

/// A named collection of cards owned by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    id: DeckId,
    owner_id: UserId,
    name: String,
    description: Option<String>,
    visibility: Visibility,
    tags: TagSet,
    card_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

struct DeckFields {
    name: String,
    description: Option<String>,
    tags: TagSet,
}

fn validate_fields(draft: DeckDraft) -> Result<(DeckFields, Visibility), DeckError> {
    let name = draft.name.trim().to_owned();
    if name.is_empty() {
        return Err(DeckError::EmptyName);
    }
    let len = name.chars().count();
    if len > MAX_DECK_NAME_LEN {
        return Err(DeckError::NameTooLong { len });
    }

    let description = draft
        .description
        .map(|d| d.trim().to_owned())
        .filter(|d| !d.is_empty());
    if let Some(desc) = &description {
        let len = desc.chars().count();
        if len > MAX_DECK_DESCRIPTION_LEN {
            return Err(DeckError::DescriptionTooLong { len });
        }
    }

    let tags = TagSet::parse(draft.tags)?;
    Ok((
        DeckFields {
            name,
            description,
            tags,
        },
        draft.visibility,
    ))
}

impl Deck {
    /// Creates a new deck with a card count of zero.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` if the name is blank or any field exceeds its limit.
    pub fn new(
        id: DeckId,
        owner_id: UserId,
        draft: DeckDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let (fields, visibility) = validate_fields(draft)?;
        Ok(Self {
            id,
            owner_id,
            name: fields.name,
            description: fields.description,
            visibility,
            tags: fields.tags,
            card_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rehydrate a deck from storage.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` if persisted fields no longer validate.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: DeckId,
        owner_id: UserId,
        draft: DeckDraft,
        card_count: u32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DeckError> {
        let mut deck = Self::new(id, owner_id, draft, created_at)?;
        deck.card_count = card_count;
        deck.updated_at = updated_at;
        Ok(deck)
    }

    #[must_use]
    pub fn id(&self) -> DeckId {
        self.id
    }

    #[must_use]
    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[must_use]
    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Cached number of cards in this deck.
    #[must_use]
    pub fn card_count(&self) -> u32 {
        self.card_count
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replace name, description, visibility and tags.
    ///
    /// # Errors
    ///
    /// Returns `DeckError` if the draft does not validate; the deck is unchanged.
    pub fn apply_edit(&mut self, draft: DeckDraft, now: DateTime<Utc>) -> Result<(), DeckError> {
        let (fields, visibility) = validate_fields(draft)?;
        self.name = fields.name;
        self.description = fields.description;
        self.tags = fields.tags;
        self.visibility = visibility;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_card_count(&mut self, count: u32) {
        self.card_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn owner() -> UserId {
        UserId::new(1)
    }

    #[test]
    fn deck_new_rejects_empty_name() {
        let err = Deck::new(DeckId::new(1), owner(), DeckDraft::new("   "), fixed_now())
            .unwrap_err();
        assert_eq!(err, DeckError::EmptyName);
    }

    #[test]
    fn deck_rejects_long_name_and_description() {
        let err = Deck::new(
            DeckId::new(1),
            owner(),
            DeckDraft::new("n".repeat(101)),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, DeckError::NameTooLong { len: 101 });

        let err = Deck::new(
            DeckId::new(1),
            owner(),
            DeckDraft::new("ok").with_description("d".repeat(501)),
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(err, DeckError::DescriptionTooLong { len: 501 });
    }

    #[test]
    fn deck_trims_and_drops_blank_description() {
        let deck = Deck::new(
            DeckId::new(1),
            owner(),
            DeckDraft::new("  Spanish  ").with_description("   "),
            fixed_now(),
        )
        .unwrap();

        assert_eq!(deck.name(), "Spanish");
        assert_eq!(deck.description(), None);
        assert_eq!(deck.visibility(), Visibility::Private);
        assert_eq!(deck.card_count(), 0);
    }

    #[test]
    fn failed_edit_leaves_deck_untouched() {
        let mut deck = Deck::new(DeckId::new(1), owner(), DeckDraft::new("French"), fixed_now())
            .unwrap();
        let err = deck.apply_edit(DeckDraft::new(""), fixed_now()).unwrap_err();
        assert_eq!(err, DeckError::EmptyName);
        assert_eq!(deck.name(), "French");

        deck.apply_edit(
            DeckDraft::new("French B1").with_visibility(Visibility::Public),
            fixed_now(),
        )
        .unwrap();
        assert!(deck.visibility().is_public());
    }

    #[test]
    fn visibility_parses_case_insensitively() {
        assert_eq!("PUBLIC".parse::<Visibility>().unwrap(), Visibility::Public);
        assert!("hidden".parse::<Visibility>().is_err());
    }
}
