//! The seam between the study engine and wherever cards live.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flashdeck_core::model::{Card, CardId, CardStats, DeckId, DifficultyFilter, StatsError};

use crate::error::CardStoreError;

mod http;
mod local;
pub mod wire;

pub use http::HttpCardStore;
pub use local::LocalCardStore;

/// Absolute statistics for one card. Never a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStatsUpdate {
    pub study_count: u32,
    pub correct_count: u32,
    pub last_studied: DateTime<Utc>,
}

impl CardStatsUpdate {
    #[must_use]
    pub fn new(stats: &CardStats, last_studied: DateTime<Utc>) -> Self {
        Self {
            study_count: stats.study_count(),
            correct_count: stats.correct_count(),
            last_studied,
        }
    }

    /// # Errors
    ///
    /// Returns `StatsError` if `correct_count > study_count`.
    pub fn to_stats(&self) -> Result<CardStats, StatsError> {
        CardStats::new(self.study_count, self.correct_count, Some(self.last_studied))
    }
}

#[async_trait]
pub trait CardStore: Send + Sync {
    /// All cards of a deck, restricted to one difficulty unless `filter` is `All`.
    ///
    /// An empty result is not an error.
    async fn list_cards(
        &self,
        deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<Vec<Card>, CardStoreError>;

    /// Overwrite a card's statistics.
    async fn update_card_stats(
        &self,
        card_id: CardId,
        update: CardStatsUpdate,
    ) -> Result<(), CardStoreError>;
}
