use chrono::{DateTime, Utc};
use flashdeck_core::model::{User, UserId};

use super::SqliteRepository;
use super::mapping::{db_err, id_to_i64, map_token_row, map_user_row, user_id_from_i64};
use crate::repository::{
    NewUserRecord, StorageError, TokenRecord, TokenRepository, UserCredentials, UserRepository,
};

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn insert_user(&self, user: NewUserRecord) -> Result<UserId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO users (username, email, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        user_id_from_i64(res.last_insert_rowid())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
            .bind(id_to_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|r| map_user_row(&r).map(|c| c.user)).transpose()
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|r| map_user_row(&r)).transpose()
    }

    async fn count_users(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        u64::try_from(count).map_err(|_| StorageError::Serialization("user count".into()))
    }
}

#[async_trait::async_trait]
impl TokenRepository for SqliteRepository {
    async fn insert_token(&self, token: &TokenRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO auth_tokens (token, user_id, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4)
            ",
        )
        .bind(&token.token)
        .bind(id_to_i64("user_id", token.user_id.value())?)
        .bind(token.created_at)
        .bind(token.expires_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_token(&self, token: &str) -> Result<Option<TokenRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT token, user_id, created_at, expires_at FROM auth_tokens WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|r| map_token_row(&r)).transpose()
    }

    async fn delete_token(&self, token: &str) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM auth_tokens WHERE token = ?1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= ?1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected())
    }
}
