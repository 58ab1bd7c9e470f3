//! Demo data for a fresh database.

use thiserror::Error;
use tracing::info;

use flashdeck_core::model::{CardDraft, DeckDraft, DeckId, Difficulty, Visibility};
use services::{AppServices, AuthError, CardServiceError, DeckServiceError};

pub const DEMO_USERNAME: &str = "demo";
pub const DEMO_PASSWORD: &str = "demo-password";
pub const DEMO_DECK: &str = "Rust Basics";

const DEMO_CARDS: &[(&str, &str, Difficulty)] = &[
    ("What keyword declares an immutable binding?", "let", Difficulty::Easy),
    ("Which macro prints a line to stdout?", "println!", Difficulty::Easy),
    ("What does `?` do on a Result?", "Returns the error early, unwrapping Ok", Difficulty::Medium),
    ("What trait lets a type be duplicated implicitly?", "Copy", Difficulty::Medium),
    ("What prevents two mutable borrows at once?", "The borrow checker", Difficulty::Hard),
    ("What does `Send` promise about a type?", "It can move to another thread", Difficulty::Hard),
];

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SeedError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Deck(#[from] DeckServiceError),
    #[error(transparent)]
    Card(#[from] CardServiceError),
}

/// What the seed run ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub deck_id: DeckId,
    pub created_user: bool,
    pub created_cards: usize,
}

/// Ensure the demo account exists and owns a populated public deck.
///
/// Running it again leaves existing data alone.
///
/// # Errors
///
/// Returns `SeedError` if any service call fails.
pub async fn seed_demo(services: &AppServices) -> Result<SeedReport, SeedError> {
    let auth = services.auth();
    let created_user = match auth
        .register(DEMO_USERNAME, "demo@example.com", DEMO_PASSWORD)
        .await
    {
        Ok(_) => true,
        Err(AuthError::UsernameTaken) => false,
        Err(e) => return Err(e.into()),
    };
    let principal = auth.principal_for(DEMO_USERNAME).await?;

    let decks = services.deck_service();
    let existing = decks
        .list_decks(&principal)
        .await?
        .into_iter()
        .find(|d| d.owner_id() == principal.user_id && d.name() == DEMO_DECK);
    if let Some(deck) = existing {
        info!(deck_id = %deck.id(), "demo deck already present");
        return Ok(SeedReport {
            deck_id: deck.id(),
            created_user,
            created_cards: 0,
        });
    }

    let deck = decks
        .create_deck(
            &principal,
            DeckDraft::new(DEMO_DECK)
                .with_description("A few questions to try the study loop")
                .with_visibility(Visibility::Public)
                .with_tags(["rust", "demo"]),
        )
        .await?;

    let cards = services.card_service();
    for (front, back, difficulty) in DEMO_CARDS {
        cards
            .create_card(
                &principal,
                deck.id(),
                CardDraft::new(*front, *back).with_difficulty(*difficulty),
            )
            .await?;
    }

    info!(deck_id = %deck.id(), cards = DEMO_CARDS.len(), "seeded demo deck");
    Ok(SeedReport {
        deck_id: deck.id(),
        created_user,
        created_cards: DEMO_CARDS.len(),
    })
}
