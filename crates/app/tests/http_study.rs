use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use app::api::{AppState, router};
use flashdeck_core::model::{CardDraft, DeckDraft, DeckId, Difficulty, DifficultyFilter};
use flashdeck_core::time::fixed_clock;
use services::{
    AppServices, CardStoreError, Clock, HttpCardStore, Principal, StartSessionError, StudyEngine,
};

struct Fixture {
    services: AppServices,
    base_url: String,
    owner: Principal,
    owner_token: String,
    other_token: String,
    deck_id: DeckId,
}

async fn serve(services: AppServices) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router(AppState::new(services)))
            .await
            .unwrap();
    });
    addr
}

async fn login(services: &AppServices, username: &str) -> (Principal, String) {
    let auth = services.auth();
    auth.register(username, &format!("{username}@example.com"), "password1")
        .await
        .unwrap();
    let issued = auth.login(username, "password1").await.unwrap();
    (Principal::from_user(&issued.user), issued.token)
}

async fn fixture() -> Fixture {
    let services = AppServices::in_memory(fixed_clock());
    let (owner, owner_token) = login(&services, "alice").await;
    let (_, other_token) = login(&services, "bob").await;

    let deck = services
        .deck_service()
        .create_deck(&owner, DeckDraft::new("Private"))
        .await
        .unwrap();
    for (front, difficulty) in [
        ("Q1", Difficulty::Easy),
        ("Q2", Difficulty::Hard),
        ("Q3", Difficulty::Hard),
    ] {
        services
            .card_service()
            .create_card(
                &owner,
                deck.id(),
                CardDraft::new(front, "A")
                    .with_difficulty(difficulty)
                    .with_tags(["drill"]),
            )
            .await
            .unwrap();
    }

    let addr = serve(services.clone()).await;
    Fixture {
        services,
        base_url: format!("http://{addr}"),
        owner,
        owner_token,
        other_token,
        deck_id: deck.id(),
    }
}

fn engine(base_url: &str, token: &str) -> StudyEngine {
    StudyEngine::new(
        Clock::default(),
        Arc::new(HttpCardStore::new(base_url, token)),
    )
}

#[tokio::test]
async fn remote_session_reads_filtered_cards_and_writes_stats() {
    let f = fixture().await;

    let mut session = engine(&f.base_url, &f.owner_token)
        .start_session(f.deck_id, DifficultyFilter::Only(Difficulty::Hard))
        .await
        .unwrap();
    assert_eq!(session.total_cards(), 2);
    assert!(
        session
            .draw()
            .iter()
            .all(|c| c.difficulty() == Difficulty::Hard && c.tags().len() == 1)
    );

    session.reveal();
    session.record_answer(true).unwrap();
    session.reveal();
    session.record_answer(false).unwrap();
    let summary = session.finish(Duration::from_secs(5)).await;
    assert_eq!(summary.accuracy, 50);

    let stored = f
        .services
        .card_service()
        .list_cards(&f.owner, f.deck_id, DifficultyFilter::Only(Difficulty::Hard))
        .await
        .unwrap();
    let studied: u32 = stored.iter().map(|c| c.stats().study_count()).sum();
    let correct: u32 = stored.iter().map(|c| c.stats().correct_count()).sum();
    assert_eq!((studied, correct), (2, 1));
    assert!(stored.iter().all(|c| c.stats().last_studied().is_some()));
}

#[tokio::test]
async fn bad_token_surfaces_as_unauthorized_fetch() {
    let f = fixture().await;

    let result = engine(&f.base_url, "not-a-token")
        .start_session(f.deck_id, DifficultyFilter::All)
        .await;
    assert!(matches!(
        result,
        Err(StartSessionError::Fetch(CardStoreError::Unauthorized))
    ));
}

#[tokio::test]
async fn foreign_private_deck_surfaces_as_unauthorized_fetch() {
    let f = fixture().await;

    let result = engine(&f.base_url, &f.other_token)
        .start_session(f.deck_id, DifficultyFilter::All)
        .await;
    assert!(matches!(
        result,
        Err(StartSessionError::Fetch(CardStoreError::Unauthorized))
    ));
}

#[tokio::test]
async fn remote_filter_without_matches_is_an_empty_set() {
    let f = fixture().await;

    let result = engine(&f.base_url, &f.owner_token)
        .start_session(f.deck_id, DifficultyFilter::Only(Difficulty::Medium))
        .await;
    assert!(matches!(
        result,
        Err(StartSessionError::EmptySet { deck_id }) if deck_id == f.deck_id
    ));

    let missing = engine(&f.base_url, &f.owner_token)
        .start_session(DeckId::new(999), DifficultyFilter::All)
        .await;
    assert!(matches!(
        missing,
        Err(StartSessionError::Fetch(CardStoreError::Status(status))) if status.as_u16() == 404
    ));
}
