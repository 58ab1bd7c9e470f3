use chrono::{DateTime, Utc};
use flashdeck_core::model::{Card, CardId, CardStats, DeckId, DifficultyFilter};

use super::SqliteRepository;
use super::mapping::{card_id_from_i64, db_err, id_to_i64, map_card_row, tags_to_json};
use crate::repository::{CardRepository, NewCardRecord, StorageError};

const CARD_COLUMNS: &str = r"
    id, deck_id, owner_id, front, back, difficulty, tags,
    study_count, correct_count, last_studied, created_at, updated_at
";

#[async_trait::async_trait]
impl CardRepository for SqliteRepository {
    async fn insert_new_card(&self, card: NewCardRecord) -> Result<CardId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO cards (deck_id, owner_id, front, back, difficulty, tags, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ",
        )
        .bind(id_to_i64("deck_id", card.deck_id.value())?)
        .bind(id_to_i64("owner_id", card.owner_id.value())?)
        .bind(card.front())
        .bind(card.back())
        .bind(card.difficulty().as_str())
        .bind(tags_to_json(card.tags())?)
        .bind(card.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        card_id_from_i64(res.last_insert_rowid())
    }

    async fn update_card(&self, card: &Card) -> Result<(), StorageError> {
        // Stats columns are owned by update_card_stats.
        let res = sqlx::query(
            r"
            UPDATE cards
            SET front = ?2, back = ?3, difficulty = ?4, tags = ?5, updated_at = ?6
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("card_id", card.id().value())?)
        .bind(card.front())
        .bind(card.back())
        .bind(card.difficulty().as_str())
        .bind(tags_to_json(card.tags())?)
        .bind(card.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_card(&self, id: CardId) -> Result<Option<Card>, StorageError> {
        let row = sqlx::query(&format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"))
            .bind(id_to_i64("card_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|r| map_card_row(&r)).transpose()
    }

    async fn list_cards(
        &self,
        deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<Vec<Card>, StorageError> {
        let deck_id = id_to_i64("deck_id", deck_id.value())?;
        let rows = match filter.difficulty() {
            Some(difficulty) => {
                sqlx::query(&format!(
                    "SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 AND difficulty = ?2 ORDER BY id ASC"
                ))
                .bind(deck_id)
                .bind(difficulty.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {CARD_COLUMNS} FROM cards WHERE deck_id = ?1 ORDER BY id ASC"
                ))
                .bind(deck_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(db_err)?;

        let mut cards = Vec::with_capacity(rows.len());
        for row in rows {
            cards.push(map_card_row(&row)?);
        }
        Ok(cards)
    }

    async fn update_card_stats(
        &self,
        id: CardId,
        stats: CardStats,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE cards
            SET study_count = ?2, correct_count = ?3, last_studied = ?4, updated_at = ?5
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("card_id", id.value())?)
        .bind(i64::from(stats.study_count()))
        .bind(i64::from(stats.correct_count()))
        .bind(stats.last_studied())
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_card(&self, id: CardId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM cards WHERE id = ?1")
            .bind(id_to_i64("card_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn count_cards_in_deck(&self, deck_id: DeckId) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cards WHERE deck_id = ?1")
            .bind(id_to_i64("deck_id", deck_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        u32::try_from(count).map_err(|_| StorageError::Serialization("card count".into()))
    }
}
