//! REST surface: JSON over axum, bearer auth on everything but register,
//! login and `/health`.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use services::AppServices;

pub mod auth;
mod cards;
mod decks;
pub mod dto;
pub mod error;
pub mod extract;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub services: AppServices,
}

impl AppState {
    #[must_use]
    pub fn new(services: AppServices) -> Self {
        Self { services }
    }
}

/// Build the full router with request tracing.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::routes())
        .nest("/decks", decks::routes())
        .nest("/cards", cards::routes());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
