use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashdeck_core::model::{
    Card, CardId, CardStats, Deck, DeckDraft, DeckId, Difficulty, DifficultyFilter, Email, TagSet,
    User, UserId, UserRole, Username, ValidatedCard, Visibility,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for a new account.
#[derive(Debug, Clone)]
pub struct NewUserRecord {
    pub username: Username,
    pub email: Email,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Account plus its stored password hash, for credential checks.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Persisted bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    pub token: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Insert shape for a deck; the id is assigned by the backend.
#[derive(Debug, Clone)]
pub struct NewDeckRecord {
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub tags: TagSet,
    pub created_at: DateTime<Utc>,
}

impl NewDeckRecord {
    /// Build an insert record from a validated deck (its id is ignored).
    #[must_use]
    pub fn from_deck(deck: &Deck) -> Self {
        Self {
            owner_id: deck.owner_id(),
            name: deck.name().to_owned(),
            description: deck.description().map(ToOwned::to_owned),
            visibility: deck.visibility(),
            tags: deck.tags().clone(),
            created_at: deck.created_at(),
        }
    }

    pub(crate) fn into_deck(self, id: DeckId) -> Result<Deck, StorageError> {
        let draft = DeckDraft {
            name: self.name,
            description: self.description,
            visibility: self.visibility,
            tags: self.tags.iter().map(|t| t.as_str().to_owned()).collect(),
        };
        Deck::new(id, self.owner_id, draft, self.created_at)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

/// Insert shape for a card; the id is assigned by the backend and stats start at zero.
#[derive(Debug, Clone)]
pub struct NewCardRecord {
    pub deck_id: DeckId,
    pub owner_id: UserId,
    pub content: ValidatedCard,
    pub created_at: DateTime<Utc>,
}

impl NewCardRecord {
    #[must_use]
    pub fn front(&self) -> &str {
        self.content.front()
    }

    #[must_use]
    pub fn back(&self) -> &str {
        self.content.back()
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.content.difficulty()
    }

    #[must_use]
    pub fn tags(&self) -> &TagSet {
        self.content.tags()
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the username is taken.
    async fn insert_user(&self, user: NewUserRecord) -> Result<UserId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError>;

    /// Look up an account and its password hash by username.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_credentials(&self, username: &str)
    -> Result<Option<UserCredentials>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_users(&self) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the token string already exists.
    async fn insert_token(&self, token: &TokenRecord) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn find_token(&self, token: &str) -> Result<Option<TokenRecord>, StorageError>;

    /// Remove a token. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_token(&self, token: &str) -> Result<bool, StorageError>;

    /// Remove tokens whose expiry is at or before `now`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, StorageError>;
}

#[async_trait]
pub trait DeckRepository: Send + Sync {
    /// Insert a new deck and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deck cannot be stored.
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError>;

    /// Update an existing deck's mutable fields.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn update_deck(&self, deck: &Deck) -> Result<(), StorageError>;

    /// Fetch a deck by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_decks_by_owner(&self, owner: UserId) -> Result<Vec<Deck>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_all_decks(&self) -> Result<Vec<Deck>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_public_decks(&self) -> Result<Vec<Deck>, StorageError>;

    /// Delete a deck together with every card it owns.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError>;

    /// Overwrite the cached card count.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn set_card_count(&self, id: DeckId, count: u32) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CardRepository: Send + Sync {
    /// Insert a new card and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the deck does not exist.
    async fn insert_new_card(&self, card: NewCardRecord) -> Result<CardId, StorageError>;

    /// Update content fields (front, back, difficulty, tags) of an existing card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist.
    async fn update_card(&self, card: &Card) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_card(&self, id: CardId) -> Result<Option<Card>, StorageError>;

    /// Cards of a deck in creation order, optionally restricted to one difficulty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_cards(
        &self,
        deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<Vec<Card>, StorageError>;

    /// Overwrite the cumulative statistics of a card.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist.
    async fn update_card_stats(
        &self,
        id: CardId,
        stats: CardStats,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the card does not exist.
    async fn delete_card(&self, id: CardId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_cards_in_deck(&self, deck_id: DeckId) -> Result<u32, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<UserId, UserCredentials>,
    tokens: HashMap<String, TokenRecord>,
    decks: BTreeMap<DeckId, Deck>,
    cards: BTreeMap<CardId, Card>,
    next_user: u64,
    next_deck: u64,
    next_card: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn insert_user(&self, user: NewUserRecord) -> Result<UserId, StorageError> {
        let mut guard = self.lock()?;
        if guard
            .users
            .values()
            .any(|u| u.user.username().as_str() == user.username.as_str())
        {
            return Err(StorageError::Conflict);
        }
        guard.next_user += 1;
        let id = UserId::new(guard.next_user);
        let stored = UserCredentials {
            user: User::new(id, user.username, user.email, user.role, user.created_at),
            password_hash: user.password_hash,
        };
        guard.users.insert(id, stored);
        Ok(id)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.users.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .users
            .values()
            .find(|c| c.user.username().as_str() == username)
            .cloned())
    }

    async fn count_users(&self) -> Result<u64, StorageError> {
        let guard = self.lock()?;
        Ok(guard.users.len() as u64)
    }
}

#[async_trait]
impl TokenRepository for InMemoryRepository {
    async fn insert_token(&self, token: &TokenRecord) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.tokens.contains_key(&token.token) {
            return Err(StorageError::Conflict);
        }
        guard.tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_token(&self, token: &str) -> Result<Option<TokenRecord>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.tokens.get(token).cloned())
    }

    async fn delete_token(&self, token: &str) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        Ok(guard.tokens.remove(token).is_some())
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.tokens.len();
        guard.tokens.retain(|_, t| t.expires_at > now);
        Ok((before - guard.tokens.len()) as u64)
    }
}

#[async_trait]
impl DeckRepository for InMemoryRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let mut guard = self.lock()?;
        guard.next_deck += 1;
        let id = DeckId::new(guard.next_deck);
        let deck = deck.into_deck(id)?;
        guard.decks.insert(id, deck);
        Ok(id)
    }

    async fn update_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .decks
            .get_mut(&deck.id())
            .ok_or(StorageError::NotFound)?;
        let card_count = slot.card_count();
        *slot = deck.clone();
        slot.set_card_count(card_count);
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.decks.get(&id).cloned())
    }

    async fn list_decks_by_owner(&self, owner: UserId) -> Result<Vec<Deck>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .decks
            .values()
            .filter(|d| d.owner_id() == owner)
            .cloned()
            .collect())
    }

    async fn list_all_decks(&self) -> Result<Vec<Deck>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.decks.values().cloned().collect())
    }

    async fn list_public_decks(&self) -> Result<Vec<Deck>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .decks
            .values()
            .filter(|d| d.visibility().is_public())
            .cloned()
            .collect())
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.decks.remove(&id).ok_or(StorageError::NotFound)?;
        guard.cards.retain(|_, c| c.deck_id() != id);
        Ok(())
    }

    async fn set_card_count(&self, id: DeckId, count: u32) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let deck = guard.decks.get_mut(&id).ok_or(StorageError::NotFound)?;
        deck.set_card_count(count);
        Ok(())
    }
}

#[async_trait]
impl CardRepository for InMemoryRepository {
    async fn insert_new_card(&self, card: NewCardRecord) -> Result<CardId, StorageError> {
        let mut guard = self.lock()?;
        if !guard.decks.contains_key(&card.deck_id) {
            return Err(StorageError::NotFound);
        }
        guard.next_card += 1;
        let id = CardId::new(guard.next_card);
        let stored = card
            .content
            .assign_id(id, card.deck_id, card.owner_id, card.created_at);
        guard.cards.insert(id, stored);
        Ok(id)
    }

    async fn update_card(&self, card: &Card) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard.cards.get_mut(&card.id()).ok_or(StorageError::NotFound)?;
        let stats = *slot.stats();
        *slot = card.clone();
        slot.set_stats(stats, card.updated_at());
        Ok(())
    }

    async fn get_card(&self, id: CardId) -> Result<Option<Card>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.cards.get(&id).cloned())
    }

    async fn list_cards(
        &self,
        deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<Vec<Card>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .cards
            .values()
            .filter(|c| c.deck_id() == deck_id && filter.matches(c.difficulty()))
            .cloned()
            .collect())
    }

    async fn update_card_stats(
        &self,
        id: CardId,
        stats: CardStats,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let card = guard.cards.get_mut(&id).ok_or(StorageError::NotFound)?;
        card.set_stats(stats, updated_at);
        Ok(())
    }

    async fn delete_card(&self, id: CardId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.cards.remove(&id).ok_or(StorageError::NotFound)?;
        Ok(())
    }

    async fn count_cards_in_deck(&self, deck_id: DeckId) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        let count = guard.cards.values().filter(|c| c.deck_id() == deck_id).count();
        u32::try_from(count).map_err(|_| StorageError::Serialization("card count overflow".into()))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub tokens: Arc<dyn TokenRepository>,
    pub decks: Arc<dyn DeckRepository>,
    pub cards: Arc<dyn CardRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            users: Arc::new(repo.clone()),
            tokens: Arc::new(repo.clone()),
            decks: Arc::new(repo.clone()),
            cards: Arc::new(repo),
        }
    }
}
