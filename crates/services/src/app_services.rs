use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::auth_service::{AuthService, DEFAULT_TOKEN_TTL_HOURS, Principal};
use crate::card_service::CardService;
use crate::card_store::LocalCardStore;
use crate::deck_service::DeckService;
use crate::error::AppServicesError;
use crate::study::StudyEngine;

/// Assembles the services shared by the HTTP API and the terminal loop.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    auth: Arc<AuthService>,
    decks: Arc<DeckService>,
    cards: Arc<CardService>,
}

impl AppServices {
    /// Build services over an already constructed storage aggregate.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, token_ttl_hours: i64) -> Self {
        let auth = AuthService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.tokens),
        )
        .with_token_ttl_hours(token_ttl_hours);
        let decks = DeckService::new(clock, Arc::clone(&storage.decks));
        let cards = CardService::new(
            clock,
            Arc::clone(&storage.decks),
            Arc::clone(&storage.cards),
        );
        Self {
            clock,
            auth: Arc::new(auth),
            decks: Arc::new(decks),
            cards: Arc::new(cards),
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        token_ttl_hours: i64,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, token_ttl_hours))
    }

    /// Services over throwaway in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, DEFAULT_TOKEN_TTL_HOURS)
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn auth(&self) -> Arc<AuthService> {
        Arc::clone(&self.auth)
    }

    #[must_use]
    pub fn deck_service(&self) -> Arc<DeckService> {
        Arc::clone(&self.decks)
    }

    #[must_use]
    pub fn card_service(&self) -> Arc<CardService> {
        Arc::clone(&self.cards)
    }

    /// A study engine reading and writing cards in-process as `principal`.
    #[must_use]
    pub fn local_study_engine(&self, principal: Principal) -> StudyEngine {
        let store = LocalCardStore::new(Arc::clone(&self.cards), principal);
        StudyEngine::new(self.clock, Arc::new(store))
    }
}
