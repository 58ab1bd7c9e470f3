//! JSON shapes shared by the REST API and the HTTP card store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flashdeck_core::model::{
    Card, CardError, CardId, CardStats, DeckId, Difficulty, TagSet, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDto {
    pub id: CardId,
    pub deck_id: DeckId,
    pub owner_id: UserId,
    pub front: String,
    pub back: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    pub study_count: u32,
    pub correct_count: u32,
    pub last_studied: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accuracy: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Card> for CardDto {
    fn from(card: &Card) -> Self {
        let stats = card.stats();
        Self {
            id: card.id(),
            deck_id: card.deck_id(),
            owner_id: card.owner_id(),
            front: card.front().to_owned(),
            back: card.back().to_owned(),
            difficulty: card.difficulty(),
            tags: card.tags().iter().map(|t| t.as_str().to_owned()).collect(),
            study_count: stats.study_count(),
            correct_count: stats.correct_count(),
            last_studied: stats.last_studied(),
            accuracy: card.accuracy(),
            created_at: card.created_at(),
            updated_at: card.updated_at(),
        }
    }
}

impl CardDto {
    /// Rebuild a domain card, re-validating every field.
    ///
    /// # Errors
    ///
    /// Returns `CardError` if text, tags or statistics are out of range.
    pub fn into_card(self) -> Result<Card, CardError> {
        let stats = CardStats::new(self.study_count, self.correct_count, self.last_studied)?;
        let tags = TagSet::parse(self.tags)?;
        Card::from_persisted(
            self.id,
            self.deck_id,
            self.owner_id,
            self.front,
            self.back,
            self.difficulty,
            tags,
            stats,
            self.created_at,
            self.updated_at,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashdeck_core::model::CardDraft;
    use flashdeck_core::time::fixed_now;

    #[test]
    fn dto_uses_camel_case_and_reports_accuracy() {
        let mut card = CardDraft::new("Q", "A")
            .with_tags(["x"])
            .validate()
            .unwrap()
            .assign_id(CardId::new(3), DeckId::new(1), UserId::new(1), fixed_now());
        card.set_stats(CardStats::new(4, 3, Some(fixed_now())).unwrap(), fixed_now());

        let json = serde_json::to_value(CardDto::from(&card)).unwrap();
        assert_eq!(json["studyCount"], 4);
        assert_eq!(json["correctCount"], 3);
        assert_eq!(json["accuracy"], 75);
        assert_eq!(json["difficulty"], "medium");
    }

    #[test]
    fn into_card_rejects_impossible_stats() {
        let card = CardDraft::new("Q", "A")
            .validate()
            .unwrap()
            .assign_id(CardId::new(3), DeckId::new(1), UserId::new(1), fixed_now());
        let mut dto = CardDto::from(&card);
        dto.correct_count = 2;

        assert!(matches!(dto.into_card(), Err(CardError::Stats(_))));
    }
}
