use std::sync::Arc;

use tracing::{debug, info};

use flashdeck_core::model::{
    Card, CardDraft, CardId, CardStats, Deck, DeckId, DifficultyFilter,
};
use storage::repository::{CardRepository, DeckRepository, NewCardRecord, StorageError};

use crate::Clock;
use crate::auth_service::Principal;
use crate::error::CardServiceError;

/// Card CRUD and statistics updates, keeping each deck's card count current.
#[derive(Clone)]
pub struct CardService {
    clock: Clock,
    decks: Arc<dyn DeckRepository>,
    cards: Arc<dyn CardRepository>,
}

impl CardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        decks: Arc<dyn DeckRepository>,
        cards: Arc<dyn CardRepository>,
    ) -> Self {
        Self {
            clock,
            decks,
            cards,
        }
    }

    /// Add a card to a deck the caller owns.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Card` for validation failures,
    /// `CardServiceError::NotFound`/`Forbidden` for deck access problems.
    pub async fn create_card(
        &self,
        principal: &Principal,
        deck_id: DeckId,
        draft: CardDraft,
    ) -> Result<Card, CardServiceError> {
        let deck = self.writable_deck(principal, deck_id).await?;
        let content = draft.validate()?;
        let card_id = self
            .cards
            .insert_new_card(NewCardRecord {
                deck_id,
                owner_id: deck.owner_id(),
                content,
                created_at: self.clock.now(),
            })
            .await
            .map_err(not_found)?;
        self.refresh_card_count(deck_id).await?;
        info!(card_id = %card_id, deck_id = %deck_id, "created card");
        self.load(card_id).await
    }

    /// Cards of a readable deck in creation order, optionally by difficulty.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::NotFound`/`Forbidden` for deck access problems.
    pub async fn list_cards(
        &self,
        principal: &Principal,
        deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<Vec<Card>, CardServiceError> {
        let deck = self.load_deck(deck_id).await?;
        if !principal.can_read(deck.owner_id(), deck.visibility().is_public()) {
            return Err(CardServiceError::Forbidden);
        }
        let cards = self.cards.list_cards(deck_id, filter).await?;
        debug!(deck_id = %deck_id, filter = %filter, count = cards.len(), "listed cards");
        Ok(cards)
    }

    /// # Errors
    ///
    /// Returns `CardServiceError::NotFound`/`Forbidden` when the card is not readable.
    pub async fn get_card(
        &self,
        principal: &Principal,
        card_id: CardId,
    ) -> Result<Card, CardServiceError> {
        let card = self.load(card_id).await?;
        let deck = self.load_deck(card.deck_id()).await?;
        if !principal.can_read(deck.owner_id(), deck.visibility().is_public()) {
            return Err(CardServiceError::Forbidden);
        }
        Ok(card)
    }

    /// Replace front, back, difficulty and tags. Statistics are untouched.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Card` for validation failures.
    pub async fn update_card(
        &self,
        principal: &Principal,
        card_id: CardId,
        draft: CardDraft,
    ) -> Result<Card, CardServiceError> {
        let mut card = self.writable_card(principal, card_id).await?;
        card.apply_edit(draft.validate()?, self.clock.now());
        self.cards.update_card(&card).await.map_err(not_found)?;
        Ok(card)
    }

    /// # Errors
    ///
    /// Returns `CardServiceError::NotFound`/`Forbidden` when the card is not writable.
    pub async fn delete_card(
        &self,
        principal: &Principal,
        card_id: CardId,
    ) -> Result<(), CardServiceError> {
        let card = self.writable_card(principal, card_id).await?;
        self.cards.delete_card(card_id).await.map_err(not_found)?;
        self.refresh_card_count(card.deck_id()).await?;
        info!(card_id = %card_id, deck_id = %card.deck_id(), "deleted card");
        Ok(())
    }

    /// Overwrite a card's cumulative statistics with absolute values.
    ///
    /// # Errors
    ///
    /// Returns `CardServiceError::Forbidden` unless the caller owns the card
    /// or is an admin.
    pub async fn update_card_stats(
        &self,
        principal: &Principal,
        card_id: CardId,
        stats: CardStats,
    ) -> Result<(), CardServiceError> {
        self.writable_card(principal, card_id).await?;
        self.cards
            .update_card_stats(card_id, stats, self.clock.now())
            .await
            .map_err(not_found)?;
        debug!(
            card_id = %card_id,
            study_count = stats.study_count(),
            correct_count = stats.correct_count(),
            "updated card stats"
        );
        Ok(())
    }

    async fn refresh_card_count(&self, deck_id: DeckId) -> Result<(), CardServiceError> {
        let count = self.cards.count_cards_in_deck(deck_id).await?;
        self.decks
            .set_card_count(deck_id, count)
            .await
            .map_err(not_found)
    }

    async fn load(&self, card_id: CardId) -> Result<Card, CardServiceError> {
        self.cards
            .get_card(card_id)
            .await?
            .ok_or(CardServiceError::NotFound)
    }

    async fn load_deck(&self, deck_id: DeckId) -> Result<Deck, CardServiceError> {
        self.decks
            .get_deck(deck_id)
            .await?
            .ok_or(CardServiceError::NotFound)
    }

    async fn writable_deck(
        &self,
        principal: &Principal,
        deck_id: DeckId,
    ) -> Result<Deck, CardServiceError> {
        let deck = self.load_deck(deck_id).await?;
        if !principal.can_write(deck.owner_id()) {
            return Err(CardServiceError::Forbidden);
        }
        Ok(deck)
    }

    async fn writable_card(
        &self,
        principal: &Principal,
        card_id: CardId,
    ) -> Result<Card, CardServiceError> {
        let card = self.load(card_id).await?;
        if !principal.can_write(card.owner_id()) {
            return Err(CardServiceError::Forbidden);
        }
        Ok(card)
    }
}

fn not_found(e: StorageError) -> CardServiceError {
    match e {
        StorageError::NotFound => CardServiceError::NotFound,
        other => CardServiceError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use flashdeck_core::model::{DeckDraft, Difficulty, UserId, UserRole, Visibility};
    use flashdeck_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    use crate::deck_service::DeckService;

    struct Fixture {
        decks: DeckService,
        cards: CardService,
        repo: InMemoryRepository,
    }

    fn fixture() -> Fixture {
        let repo = InMemoryRepository::new();
        let decks: Arc<dyn DeckRepository> = Arc::new(repo.clone());
        let cards: Arc<dyn CardRepository> = Arc::new(repo.clone());
        Fixture {
            decks: DeckService::new(fixed_clock(), Arc::clone(&decks)),
            cards: CardService::new(fixed_clock(), decks, cards),
            repo,
        }
    }

    fn principal(id: u64) -> Principal {
        Principal {
            user_id: UserId::new(id),
            username: format!("user{id}"),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn card_count_follows_create_and_delete() {
        let f = fixture();
        let owner = principal(1);
        let deck = f
            .decks
            .create_deck(&owner, DeckDraft::new("Deck"))
            .await
            .unwrap();

        let first = f
            .cards
            .create_card(&owner, deck.id(), CardDraft::new("Q1", "A1"))
            .await
            .unwrap();
        f.cards
            .create_card(&owner, deck.id(), CardDraft::new("Q2", "A2"))
            .await
            .unwrap();
        assert_eq!(
            f.repo.get_deck(deck.id()).await.unwrap().unwrap().card_count(),
            2
        );

        f.cards.delete_card(&owner, first.id()).await.unwrap();
        assert_eq!(
            f.repo.get_deck(deck.id()).await.unwrap().unwrap().card_count(),
            1
        );
    }

    #[tokio::test]
    async fn public_deck_cards_are_readable_but_not_writable() {
        let f = fixture();
        let owner = principal(1);
        let visitor = principal(2);
        let deck = f
            .decks
            .create_deck(
                &owner,
                DeckDraft::new("Shared").with_visibility(Visibility::Public),
            )
            .await
            .unwrap();
        let card = f
            .cards
            .create_card(
                &owner,
                deck.id(),
                CardDraft::new("Q", "A").with_difficulty(Difficulty::Hard),
            )
            .await
            .unwrap();

        let listed = f
            .cards
            .list_cards(&visitor, deck.id(), DifficultyFilter::Only(Difficulty::Hard))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let stats = CardStats::new(1, 1, Some(fixed_now())).unwrap();
        assert!(matches!(
            f.cards.update_card_stats(&visitor, card.id(), stats).await,
            Err(CardServiceError::Forbidden)
        ));
        assert!(matches!(
            f.cards
                .create_card(&visitor, deck.id(), CardDraft::new("X", "Y"))
                .await,
            Err(CardServiceError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn update_card_keeps_stats() {
        let f = fixture();
        let owner = principal(1);
        let deck = f
            .decks
            .create_deck(&owner, DeckDraft::new("Deck"))
            .await
            .unwrap();
        let card = f
            .cards
            .create_card(&owner, deck.id(), CardDraft::new("Q", "A"))
            .await
            .unwrap();
        let stats = CardStats::new(4, 2, Some(fixed_now())).unwrap();
        f.cards
            .update_card_stats(&owner, card.id(), stats)
            .await
            .unwrap();

        let edited = f
            .cards
            .update_card(&owner, card.id(), CardDraft::new("Q2", "A2"))
            .await
            .unwrap();
        assert_eq!(edited.front(), "Q2");

        let fetched = f.cards.get_card(&owner, card.id()).await.unwrap();
        assert_eq!(*fetched.stats(), stats);
        assert_eq!(fetched.back(), "A2");
    }

    #[tokio::test]
    async fn missing_deck_is_not_found() {
        let f = fixture();
        let result = f
            .cards
            .list_cards(&principal(1), DeckId::new(99), DifficultyFilter::All)
            .await;
        assert!(matches!(result, Err(CardServiceError::NotFound)));
    }
}
