use axum::extract::{FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::{Json, Router, routing::get, routing::post};

use services::Principal;

use super::AppState;
use super::dto::{LoginRequest, LoginResponse, RegisterRequest, UserDto};
use super::error::ApiError;
use super::extract::ApiJson;

/// Authenticated caller. Add as a handler parameter to require a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(ApiError::missing_token)?;
        let principal = state.services.auth().authenticate(token).await?;
        Ok(Self {
            principal,
            token: token.to_owned(),
        })
    }
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserDto>), ApiError> {
    let user = state
        .services
        .auth()
        .register(&body.username, &body.email, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(UserDto::from(&user))))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let issued = state
        .services
        .auth()
        .login(&body.username, &body.password)
        .await?;
    Ok(Json(LoginResponse::from(issued)))
}

async fn logout(State(state): State<AppState>, auth: AuthUser) -> Result<StatusCode, ApiError> {
    state.services.auth().logout(&auth.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<UserDto>, ApiError> {
    let user = state.services.auth().resolve_user(&auth.token).await?;
    Ok(Json(UserDto::from(&user)))
}
