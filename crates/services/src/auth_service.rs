use std::sync::Arc;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use rand_core::OsRng;
use tracing::{debug, info};
use uuid::Uuid;

use flashdeck_core::model::{Email, User, UserId, UserRole, Username};
use storage::repository::{
    NewUserRecord, StorageError, TokenRecord, TokenRepository, UserRepository,
};

use crate::Clock;
use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;

/// Identity resolved from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: UserRole,
}

impl Principal {
    #[must_use]
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id(),
            username: user.username().as_str().to_owned(),
            role: user.role(),
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Owners and admins may modify a resource.
    #[must_use]
    pub fn can_write(&self, owner: UserId) -> bool {
        self.is_admin() || self.user_id == owner
    }

    /// Anyone may read public resources; otherwise the write rule applies.
    #[must_use]
    pub fn can_read(&self, owner: UserId, public: bool) -> bool {
        public || self.can_write(owner)
    }
}

/// A freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

/// Registration, login and bearer-token resolution.
#[derive(Clone)]
pub struct AuthService {
    clock: Clock,
    token_ttl: Duration,
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenRepository>,
}

impl AuthService {
    #[must_use]
    pub fn new(
        clock: Clock,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenRepository>,
    ) -> Self {
        Self {
            clock,
            token_ttl: Duration::hours(DEFAULT_TOKEN_TTL_HOURS),
            users,
            tokens,
        }
    }

    #[must_use]
    pub fn with_token_ttl_hours(mut self, hours: i64) -> Self {
        self.token_ttl = Duration::hours(hours.max(1));
        self
    }

    /// Create an account. The very first account becomes an admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::User` for malformed usernames or emails,
    /// `AuthError::WeakPassword` for short passwords and
    /// `AuthError::UsernameTaken` when the name is already registered.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let username = Username::new(username)?;
        let email = Email::new(email)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }

        let role = if self.users.count_users().await? == 0 {
            UserRole::Admin
        } else {
            UserRole::User
        };
        let password_hash = hash_password(password)?;
        let created_at = self.clock.now();

        let id = self
            .users
            .insert_user(NewUserRecord {
                username: username.clone(),
                email: email.clone(),
                password_hash,
                role,
                created_at,
            })
            .await
            .map_err(|e| match e {
                StorageError::Conflict => AuthError::UsernameTaken,
                other => AuthError::Storage(other),
            })?;

        info!(user_id = %id, username = %username, role = %role, "registered user");
        Ok(User::new(id, username, email, role, created_at))
    }

    /// Verify credentials and issue a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown user or wrong password.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AuthError> {
        let Some(creds) = self.users.find_credentials(username.trim()).await? else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_password(password, &creds.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let now = self.clock.now();
        let record = TokenRecord {
            token: Uuid::new_v4().simple().to_string(),
            user_id: creds.user.id(),
            created_at: now,
            expires_at: now + self.token_ttl,
        };
        self.tokens.insert_token(&record).await?;

        info!(user_id = %creds.user.id(), "issued token");
        Ok(IssuedToken {
            token: record.token,
            expires_at: record.expires_at,
            user: creds.user,
        })
    }

    /// Resolve a bearer token to its principal.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for unknown or expired tokens.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let user = self.resolve_user(token).await?;
        Ok(Principal::from_user(&user))
    }

    /// Resolve a bearer token to the full account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for unknown or expired tokens.
    pub async fn resolve_user(&self, token: &str) -> Result<User, AuthError> {
        let record = self
            .tokens
            .find_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;
        if record.expires_at <= self.clock.now() {
            debug!(user_id = %record.user_id, "rejected expired token");
            return Err(AuthError::InvalidToken);
        }
        self.users
            .get_user(record.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Principal for a username without a password check.
    ///
    /// For operators with direct access to the database, such as the local
    /// study loop and the seed command.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user does not exist.
    pub async fn principal_for(&self, username: &str) -> Result<Principal, AuthError> {
        let creds = self
            .users
            .find_credentials(username.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        Ok(Principal::from_user(&creds.user))
    }

    /// Revoke a token. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the repository fails.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        if self.tokens.delete_token(token).await? {
            debug!("revoked token");
        }
        Ok(())
    }

    /// Drop every token that has expired by now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the repository fails.
    pub async fn purge_expired_tokens(&self) -> Result<u64, AuthError> {
        let purged = self.tokens.delete_expired_tokens(self.clock.now()).await?;
        if purged > 0 {
            info!(purged, "purged expired tokens");
        }
        Ok(purged)
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
