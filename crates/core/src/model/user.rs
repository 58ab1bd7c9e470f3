use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UserError {
    #[error("username must be 3-32 characters of letters, digits, '_' or '-'")]
    InvalidUsername,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid role: {0}")]
    InvalidRole(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = UserError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(UserError::InvalidRole(other.to_owned())),
        }
    }
}

/// Validated login name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// # Errors
    ///
    /// Returns `UserError::InvalidUsername` unless the trimmed value is 3-32
    /// ASCII letters, digits, `_` or `-`.
    pub fn new(value: impl Into<String>) -> Result<Self, UserError> {
        let raw = value.into();
        let trimmed = raw.trim();
        let ok_len = (3..=32).contains(&trimmed.len());
        let ok_chars = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !ok_len || !ok_chars {
            return Err(UserError::InvalidUsername);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Email with exactly one `@` and something on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    /// # Errors
    ///
    /// Returns `UserError::InvalidEmail` for malformed addresses.
    pub fn new(value: impl Into<String>) -> Result<Self, UserError> {
        let raw = value.into();
        let trimmed = raw.trim();
        let mut parts = trimmed.split('@');
        let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(UserError::InvalidEmail);
        };
        if local.is_empty() || domain.is_empty() || trimmed.contains(char::is_whitespace) {
            return Err(UserError::InvalidEmail);
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A registered account. The password hash stays in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: Username,
    email: Email,
    role: UserRole,
    created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(
        id: UserId,
        username: Username,
        email: Email,
        role: UserRole,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username,
            email,
            role,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        &self.username
    }

    #[must_use]
    pub fn email(&self) -> &Email {
        &self.email
    }

    #[must_use]
    pub fn role(&self) -> UserRole {
        self.role
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
