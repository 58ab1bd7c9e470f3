use flashdeck_core::model::{
    Card, CardId, CardStats, Deck, DeckDraft, DeckId, Difficulty, Email, TagSet, User, UserId,
    UserRole, Username, Visibility,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{StorageError, TokenRecord, UserCredentials};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors, turning uniqueness violations into `Conflict`.
pub(crate) fn db_err(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn deck_id_from_i64(v: i64) -> Result<DeckId, StorageError> {
    Ok(DeckId::new(i64_to_u64("deck_id", v)?))
}

pub(crate) fn card_id_from_i64(v: i64) -> Result<CardId, StorageError> {
    Ok(CardId::new(i64_to_u64("card_id", v)?))
}

pub(crate) fn tags_to_json(tags: &TagSet) -> Result<String, StorageError> {
    serde_json::to_string(tags).map_err(ser)
}

fn tags_from_json(raw: &str) -> Result<TagSet, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<UserCredentials, StorageError> {
    let role: String = row.try_get("role").map_err(ser)?;
    let user = User::new(
        user_id_from_i64(row.try_get("id").map_err(ser)?)?,
        Username::new(row.try_get::<String, _>("username").map_err(ser)?).map_err(ser)?,
        Email::new(row.try_get::<String, _>("email").map_err(ser)?).map_err(ser)?,
        role.parse::<UserRole>().map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    );
    Ok(UserCredentials {
        user,
        password_hash: row.try_get("password_hash").map_err(ser)?,
    })
}

pub(crate) fn map_token_row(row: &SqliteRow) -> Result<TokenRecord, StorageError> {
    Ok(TokenRecord {
        token: row.try_get("token").map_err(ser)?,
        user_id: user_id_from_i64(row.try_get("user_id").map_err(ser)?)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        expires_at: row.try_get("expires_at").map_err(ser)?,
    })
}

pub(crate) fn map_deck_row(row: &SqliteRow) -> Result<Deck, StorageError> {
    let visibility: String = row.try_get("visibility").map_err(ser)?;
    let tags = tags_from_json(&row.try_get::<String, _>("tags").map_err(ser)?)?;
    let draft = DeckDraft {
        name: row.try_get("name").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        visibility: visibility.parse::<Visibility>().map_err(ser)?,
        tags: tags.iter().map(|t| t.as_str().to_owned()).collect(),
    };
    Deck::from_persisted(
        deck_id_from_i64(row.try_get("id").map_err(ser)?)?,
        user_id_from_i64(row.try_get("owner_id").map_err(ser)?)?,
        draft,
        i64_to_u32("card_count", row.try_get("card_count").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_card_row(row: &SqliteRow) -> Result<Card, StorageError> {
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let stats = CardStats::new(
        i64_to_u32("study_count", row.try_get("study_count").map_err(ser)?)?,
        i64_to_u32("correct_count", row.try_get("correct_count").map_err(ser)?)?,
        row.try_get("last_studied").map_err(ser)?,
    )
    .map_err(ser)?;

    Card::from_persisted(
        card_id_from_i64(row.try_get("id").map_err(ser)?)?,
        deck_id_from_i64(row.try_get("deck_id").map_err(ser)?)?,
        user_id_from_i64(row.try_get("owner_id").map_err(ser)?)?,
        row.try_get("front").map_err(ser)?,
        row.try_get("back").map_err(ser)?,
        difficulty.parse::<Difficulty>().map_err(ser)?,
        tags_from_json(&row.try_get::<String, _>("tags").map_err(ser)?)?,
        stats,
        row.try_get("created_at").map_err(ser)?,
        row.try_get("updated_at").map_err(ser)?,
    )
    .map_err(ser)
}
