use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};

use flashdeck_core::model::{DeckId, DifficultyFilter};

use super::AppState;
use super::auth::AuthUser;
use super::dto::{CardDto, CardInput, CardQuery, DeckDto, DeckInput};
use super::error::ApiError;
use super::extract::{ApiJson, ApiPath};

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_decks).post(create_deck))
        .route("/public", get(list_public_decks))
        .route(
            "/{id}",
            get(get_deck).put(update_deck).delete(delete_deck),
        )
        .route("/{id}/cards", get(list_cards).post(create_card))
}

async fn list_decks(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<DeckDto>>, ApiError> {
    let decks = state
        .services
        .deck_service()
        .list_decks(&auth.principal)
        .await?;
    Ok(Json(decks.iter().map(DeckDto::from).collect()))
}

async fn list_public_decks(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<DeckDto>>, ApiError> {
    let decks = state.services.deck_service().list_public_decks().await?;
    Ok(Json(decks.iter().map(DeckDto::from).collect()))
}

async fn create_deck(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<DeckInput>,
) -> Result<(StatusCode, Json<DeckDto>), ApiError> {
    let deck = state
        .services
        .deck_service()
        .create_deck(&auth.principal, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(DeckDto::from(&deck))))
}

async fn get_deck(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DeckId>,
) -> Result<Json<DeckDto>, ApiError> {
    let deck = state
        .services
        .deck_service()
        .get_deck(&auth.principal, id)
        .await?;
    Ok(Json(DeckDto::from(&deck)))
}

async fn update_deck(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DeckId>,
    ApiJson(body): ApiJson<DeckInput>,
) -> Result<Json<DeckDto>, ApiError> {
    let deck = state
        .services
        .deck_service()
        .update_deck(&auth.principal, id, body.into())
        .await?;
    Ok(Json(DeckDto::from(&deck)))
}

async fn delete_deck(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DeckId>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .deck_service()
        .delete_deck(&auth.principal, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_cards(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DeckId>,
    Query(query): Query<CardQuery>,
) -> Result<Json<Vec<CardDto>>, ApiError> {
    let filter = match query.difficulty.as_deref() {
        Some(raw) => raw
            .parse::<DifficultyFilter>()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?,
        None => DifficultyFilter::All,
    };
    let cards = state
        .services
        .card_service()
        .list_cards(&auth.principal, id, filter)
        .await?;
    Ok(Json(cards.iter().map(CardDto::from).collect()))
}

async fn create_card(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(id): ApiPath<DeckId>,
    ApiJson(body): ApiJson<CardInput>,
) -> Result<(StatusCode, Json<CardDto>), ApiError> {
    let card = state
        .services
        .card_service()
        .create_card(&auth.principal, id, body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(CardDto::from(&card))))
}
