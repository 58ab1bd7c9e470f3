use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get, routing::put};

use flashdeck_core::model::CardId;
use services::CardStatsUpdate;

use super::AppState;
use super::auth::AuthUser;
use super::dto::{CardDto, CardInput};
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/{id}",
            get(get_card).put(update_card).delete(delete_card),
        )
        .route("/{id}/stats", put(update_card_stats))
}

async fn get_card(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<CardId>,
) -> Result<Json<CardDto>, ApiError> {
    let card = state
        .services
        .card_service()
        .get_card(&auth.principal, id)
        .await?;
    Ok(Json(CardDto::from(&card)))
}

async fn update_card(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<CardId>,
    ApiJson(body): ApiJson<CardInput>,
) -> Result<Json<CardDto>, ApiError> {
    let card = state
        .services
        .card_service()
        .update_card(&auth.principal, id, body.into())
        .await?;
    Ok(Json(CardDto::from(&card)))
}

async fn delete_card(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<CardId>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .card_service()
        .delete_card(&auth.principal, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_card_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<CardId>,
    ApiJson(body): ApiJson<CardStatsUpdate>,
) -> Result<StatusCode, ApiError> {
    let stats = body
        .to_stats()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    state
        .services
        .card_service()
        .update_card_stats(&auth.principal, id, stats)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
