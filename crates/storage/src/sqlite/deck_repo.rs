use flashdeck_core::model::{Deck, DeckId, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, deck_id_from_i64, id_to_i64, map_deck_row, tags_to_json};
use crate::repository::{DeckRepository, NewDeckRecord, StorageError};

const DECK_COLUMNS: &str =
    "id, owner_id, name, description, visibility, tags, card_count, created_at, updated_at";

impl SqliteRepository {
    async fn fetch_decks(
        &self,
        filter: &str,
        owner: Option<UserId>,
    ) -> Result<Vec<Deck>, StorageError> {
        let sql = format!("SELECT {DECK_COLUMNS} FROM decks {filter} ORDER BY id ASC");
        let mut query = sqlx::query(&sql);
        if let Some(owner) = owner {
            query = query.bind(id_to_i64("owner_id", owner.value())?);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_err)?;

        let mut decks = Vec::with_capacity(rows.len());
        for row in rows {
            decks.push(map_deck_row(&row)?);
        }
        Ok(decks)
    }
}

#[async_trait::async_trait]
impl DeckRepository for SqliteRepository {
    async fn insert_new_deck(&self, deck: NewDeckRecord) -> Result<DeckId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO decks (owner_id, name, description, visibility, tags, card_count, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
            ",
        )
        .bind(id_to_i64("owner_id", deck.owner_id.value())?)
        .bind(deck.name)
        .bind(deck.description)
        .bind(deck.visibility.as_str())
        .bind(tags_to_json(&deck.tags)?)
        .bind(deck.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        deck_id_from_i64(res.last_insert_rowid())
    }

    async fn update_deck(&self, deck: &Deck) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE decks
            SET name = ?2, description = ?3, visibility = ?4, tags = ?5, updated_at = ?6
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("deck_id", deck.id().value())?)
        .bind(deck.name())
        .bind(deck.description())
        .bind(deck.visibility().as_str())
        .bind(tags_to_json(deck.tags())?)
        .bind(deck.updated_at())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_deck(&self, id: DeckId) -> Result<Option<Deck>, StorageError> {
        let row = sqlx::query(&format!("SELECT {DECK_COLUMNS} FROM decks WHERE id = ?1"))
            .bind(id_to_i64("deck_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|r| map_deck_row(&r)).transpose()
    }

    async fn list_decks_by_owner(&self, owner: UserId) -> Result<Vec<Deck>, StorageError> {
        self.fetch_decks("WHERE owner_id = ?1", Some(owner)).await
    }

    async fn list_all_decks(&self) -> Result<Vec<Deck>, StorageError> {
        self.fetch_decks("", None).await
    }

    async fn list_public_decks(&self) -> Result<Vec<Deck>, StorageError> {
        self.fetch_decks("WHERE visibility = 'public'", None).await
    }

    async fn delete_deck(&self, id: DeckId) -> Result<(), StorageError> {
        let id = id_to_i64("deck_id", id.value())?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM cards WHERE deck_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let res = sqlx::query("DELETE FROM decks WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn set_card_count(&self, id: DeckId, count: u32) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE decks SET card_count = ?2 WHERE id = ?1")
            .bind(id_to_i64("deck_id", id.value())?)
            .bind(i64::from(count))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
