#![forbid(unsafe_code)]

pub mod app_services;
pub mod auth_service;
pub mod card_service;
pub mod card_store;
pub mod deck_service;
pub mod error;
pub mod study;

pub use flashdeck_core::Clock;

pub use app_services::AppServices;
pub use auth_service::{AuthService, IssuedToken, Principal};
pub use card_service::CardService;
pub use card_store::{CardStatsUpdate, CardStore, HttpCardStore, LocalCardStore};
pub use deck_service::DeckService;
pub use error::{
    AppServicesError, AuthError, CardServiceError, CardStoreError, DeckServiceError,
    StartSessionError,
};
pub use study::{ActiveSession, StatsSync, StudyEngine};
