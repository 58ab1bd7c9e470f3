//! Shared error types for the services crate.

use thiserror::Error;

use flashdeck_core::model::{CardError, DeckError, DeckId, StatsError, UserError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `AuthService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("username is already taken")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("missing or expired token")]
    InvalidToken,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DeckService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeckServiceError {
    #[error(transparent)]
    Deck(#[from] DeckError),
    #[error("deck not found")]
    NotFound,
    #[error("not allowed to access this deck")]
    Forbidden,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CardServiceError {
    #[error(transparent)]
    Card(#[from] CardError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error("card or deck not found")]
    NotFound,
    #[error("not allowed to access this card")]
    Forbidden,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CardStore` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CardStoreError {
    #[error(transparent)]
    Service(#[from] CardServiceError),
    #[error("card store rejected the credentials")]
    Unauthorized,
    #[error("card store request failed with status {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("invalid card payload: {0}")]
    Payload(#[from] CardError),
}

/// Errors emitted while starting a study session.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StartSessionError {
    #[error("no cards in deck {deck_id} match the requested difficulty")]
    EmptySet { deck_id: DeckId },
    #[error("failed to fetch cards: {0}")]
    Fetch(#[from] CardStoreError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
