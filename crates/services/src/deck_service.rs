use std::sync::Arc;

use tracing::info;

use flashdeck_core::model::{Deck, DeckDraft, DeckId};
use storage::repository::{DeckRepository, NewDeckRecord, StorageError};

use crate::Clock;
use crate::auth_service::Principal;
use crate::error::DeckServiceError;

/// Deck CRUD with ownership checks.
#[derive(Clone)]
pub struct DeckService {
    clock: Clock,
    decks: Arc<dyn DeckRepository>,
}

impl DeckService {
    #[must_use]
    pub fn new(clock: Clock, decks: Arc<dyn DeckRepository>) -> Self {
        Self { clock, decks }
    }

    /// Create a deck owned by `principal`.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Deck` for validation failures.
    /// Returns `DeckServiceError::Storage` if persistence fails.
    pub async fn create_deck(
        &self,
        principal: &Principal,
        draft: DeckDraft,
    ) -> Result<Deck, DeckServiceError> {
        let now = self.clock.now();
        let deck = Deck::new(DeckId::new(0), principal.user_id, draft, now)?;
        let deck_id = self
            .decks
            .insert_new_deck(NewDeckRecord::from_deck(&deck))
            .await?;
        info!(deck_id = %deck_id, owner = %principal.user_id, "created deck");
        self.load(deck_id).await
    }

    /// Decks owned by the caller, or every deck for admins, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn list_decks(&self, principal: &Principal) -> Result<Vec<Deck>, DeckServiceError> {
        let decks = if principal.is_admin() {
            self.decks.list_all_decks().await?
        } else {
            self.decks.list_decks_by_owner(principal.user_id).await?
        };
        Ok(decks)
    }

    /// # Errors
    ///
    /// Returns `DeckServiceError::Storage` if repository access fails.
    pub async fn list_public_decks(&self) -> Result<Vec<Deck>, DeckServiceError> {
        Ok(self.decks.list_public_decks().await?)
    }

    /// Fetch a deck the caller may read.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` or `DeckServiceError::Forbidden`.
    pub async fn get_deck(
        &self,
        principal: &Principal,
        deck_id: DeckId,
    ) -> Result<Deck, DeckServiceError> {
        let deck = self.load(deck_id).await?;
        if !principal.can_read(deck.owner_id(), deck.visibility().is_public()) {
            return Err(DeckServiceError::Forbidden);
        }
        Ok(deck)
    }

    /// Replace name, description, visibility and tags.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::Deck` if validation fails,
    /// `DeckServiceError::Forbidden` for non-owners.
    pub async fn update_deck(
        &self,
        principal: &Principal,
        deck_id: DeckId,
        draft: DeckDraft,
    ) -> Result<Deck, DeckServiceError> {
        let mut deck = self.load_writable(principal, deck_id).await?;
        deck.apply_edit(draft, self.clock.now())?;
        self.decks.update_deck(&deck).await?;
        Ok(deck)
    }

    /// Delete a deck and all of its cards.
    ///
    /// # Errors
    ///
    /// Returns `DeckServiceError::NotFound` or `DeckServiceError::Forbidden`.
    pub async fn delete_deck(
        &self,
        principal: &Principal,
        deck_id: DeckId,
    ) -> Result<(), DeckServiceError> {
        let deck = self.load_writable(principal, deck_id).await?;
        self.decks.delete_deck(deck.id()).await.map_err(not_found)?;
        info!(deck_id = %deck_id, cards = deck.card_count(), "deleted deck");
        Ok(())
    }

    async fn load(&self, deck_id: DeckId) -> Result<Deck, DeckServiceError> {
        self.decks
            .get_deck(deck_id)
            .await?
            .ok_or(DeckServiceError::NotFound)
    }

    async fn load_writable(
        &self,
        principal: &Principal,
        deck_id: DeckId,
    ) -> Result<Deck, DeckServiceError> {
        let deck = self.load(deck_id).await?;
        if !principal.can_write(deck.owner_id()) {
            return Err(DeckServiceError::Forbidden);
        }
        Ok(deck)
    }
}

fn not_found(e: StorageError) -> DeckServiceError {
    match e {
        StorageError::NotFound => DeckServiceError::NotFound,
        other => DeckServiceError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use flashdeck_core::model::{UserId, UserRole, Visibility};
    use flashdeck_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn principal(id: u64, role: UserRole) -> Principal {
        Principal {
            user_id: UserId::new(id),
            username: format!("user{id}"),
            role,
        }
    }

    fn service() -> DeckService {
        DeckService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn create_defaults_to_private_and_zero_cards() {
        let svc = service();
        let owner = principal(1, UserRole::User);
        let deck = svc
            .create_deck(&owner, DeckDraft::new("Spanish").with_description("   "))
            .await
            .unwrap();

        assert_eq!(deck.visibility(), Visibility::Private);
        assert_eq!(deck.description(), None);
        assert_eq!(deck.card_count(), 0);
    }

    #[tokio::test]
    async fn private_decks_are_hidden_from_other_users() {
        let svc = service();
        let owner = principal(1, UserRole::User);
        let other = principal(2, UserRole::User);
        let admin = principal(3, UserRole::Admin);

        let private = svc
            .create_deck(&owner, DeckDraft::new("Mine"))
            .await
            .unwrap();
        let public = svc
            .create_deck(
                &owner,
                DeckDraft::new("Shared").with_visibility(Visibility::Public),
            )
            .await
            .unwrap();

        assert!(matches!(
            svc.get_deck(&other, private.id()).await,
            Err(DeckServiceError::Forbidden)
        ));
        assert!(svc.get_deck(&other, public.id()).await.is_ok());
        assert!(svc.get_deck(&admin, private.id()).await.is_ok());
        assert!(matches!(
            svc.update_deck(&other, public.id(), DeckDraft::new("Hijack"))
                .await,
            Err(DeckServiceError::Forbidden)
        ));

        assert_eq!(svc.list_decks(&other).await.unwrap().len(), 0);
        assert_eq!(svc.list_decks(&admin).await.unwrap().len(), 2);
        assert_eq!(svc.list_public_decks().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let svc = service();
        let owner = principal(1, UserRole::User);
        let deck = svc
            .create_deck(&owner, DeckDraft::new("Old"))
            .await
            .unwrap();

        let updated = svc
            .update_deck(&owner, deck.id(), DeckDraft::new("New").with_tags(["a", "a"]))
            .await
            .unwrap();
        assert_eq!(updated.name(), "New");
        assert_eq!(updated.tags().len(), 1);

        let invalid = svc.update_deck(&owner, deck.id(), DeckDraft::new("  ")).await;
        assert!(matches!(invalid, Err(DeckServiceError::Deck(_))));

        svc.delete_deck(&owner, deck.id()).await.unwrap();
        assert!(matches!(
            svc.get_deck(&owner, deck.id()).await,
            Err(DeckServiceError::NotFound)
        ));
    }
}
