use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flashdeck_core::model::{
    CardDraft, Deck, DeckDraft, DeckId, Difficulty, User, UserId, UserRole, Visibility,
};
use services::IssuedToken;

pub use services::card_store::wire::CardDto;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            username: user.username().as_str().to_owned(),
            email: user.email().as_str().to_owned(),
            role: user.role(),
            created_at: user.created_at(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserDto,
}

impl From<IssuedToken> for LoginResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            user: UserDto::from(&issued.user),
            token: issued.token,
            expires_at: issued.expires_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<DeckInput> for DeckDraft {
    fn from(input: DeckInput) -> Self {
        DeckDraft {
            name: input.name,
            description: input.description,
            visibility: input.visibility,
            tags: input.tags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckDto {
    pub id: DeckId,
    pub owner_id: UserId,
    pub name: String,
    pub description: Option<String>,
    pub visibility: Visibility,
    pub tags: Vec<String>,
    pub card_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Deck> for DeckDto {
    fn from(deck: &Deck) -> Self {
        Self {
            id: deck.id(),
            owner_id: deck.owner_id(),
            name: deck.name().to_owned(),
            description: deck.description().map(ToOwned::to_owned),
            visibility: deck.visibility(),
            tags: deck.tags().iter().map(|t| t.as_str().to_owned()).collect(),
            card_count: deck.card_count(),
            created_at: deck.created_at(),
            updated_at: deck.updated_at(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInput {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<CardInput> for CardDraft {
    fn from(input: CardInput) -> Self {
        CardDraft {
            front: input.front,
            back: input.back,
            difficulty: input.difficulty,
            tags: input.tags,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardQuery {
    pub difficulty: Option<String>,
}
