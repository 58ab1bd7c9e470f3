use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use services::{AuthError, CardServiceError, DeckServiceError};
use storage::StorageError;

/// Error returned by every handler, rendered as `{ "error": msg }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn missing_token() -> Self {
        ApiError::Unauthorized("missing bearer token".into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            error!(detail = %detail, "request failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn from_storage(e: StorageError) -> ApiError {
    match e {
        StorageError::NotFound => ApiError::NotFound("not found".into()),
        StorageError::Conflict => ApiError::Conflict("conflict".into()),
        other => ApiError::Internal(other.to_string()),
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::User(_) | AuthError::WeakPassword { .. } => {
                ApiError::BadRequest(e.to_string())
            }
            AuthError::UsernameTaken => ApiError::Conflict(e.to_string()),
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::Storage(inner) => from_storage(inner),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<DeckServiceError> for ApiError {
    fn from(e: DeckServiceError) -> Self {
        match e {
            DeckServiceError::Deck(_) => ApiError::BadRequest(e.to_string()),
            DeckServiceError::NotFound => ApiError::NotFound(e.to_string()),
            DeckServiceError::Forbidden => ApiError::Forbidden(e.to_string()),
            DeckServiceError::Storage(inner) => from_storage(inner),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CardServiceError> for ApiError {
    fn from(e: CardServiceError) -> Self {
        match e {
            CardServiceError::Card(_) | CardServiceError::Stats(_) => {
                ApiError::BadRequest(e.to_string())
            }
            CardServiceError::NotFound => ApiError::NotFound(e.to_string()),
            CardServiceError::Forbidden => ApiError::Forbidden(e.to_string()),
            CardServiceError::Storage(inner) => from_storage(inner),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(AuthError::UsernameTaken).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(DeckServiceError::Forbidden).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(CardServiceError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(CardServiceError::Storage(StorageError::Connection("x".into())))
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
