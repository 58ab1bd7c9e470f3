use std::sync::Arc;

use async_trait::async_trait;

use flashdeck_core::model::{Card, CardId, DeckId, DifficultyFilter};

use super::{CardStatsUpdate, CardStore};
use crate::auth_service::Principal;
use crate::card_service::CardService;
use crate::error::{CardServiceError, CardStoreError};

/// In-process store acting on behalf of one principal.
#[derive(Clone)]
pub struct LocalCardStore {
    cards: Arc<CardService>,
    principal: Principal,
}

impl LocalCardStore {
    #[must_use]
    pub fn new(cards: Arc<CardService>, principal: Principal) -> Self {
        Self { cards, principal }
    }
}

#[async_trait]
impl CardStore for LocalCardStore {
    async fn list_cards(
        &self,
        deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<Vec<Card>, CardStoreError> {
        Ok(self
            .cards
            .list_cards(&self.principal, deck_id, filter)
            .await?)
    }

    async fn update_card_stats(
        &self,
        card_id: CardId,
        update: CardStatsUpdate,
    ) -> Result<(), CardStoreError> {
        let stats = update.to_stats().map_err(CardServiceError::from)?;
        self.cards
            .update_card_stats(&self.principal, card_id, stats)
            .await?;
        Ok(())
    }
}
