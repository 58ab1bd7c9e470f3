use chrono::Duration;
use flashdeck_core::model::{
    CardDraft, CardStats, Deck, DeckDraft, DeckId, Difficulty, DifficultyFilter, Email, UserId,
    UserRole, Username, Visibility,
};
use flashdeck_core::time::fixed_now;
use storage::repository::{
    CardRepository, DeckRepository, NewCardRecord, NewDeckRecord, NewUserRecord, StorageError,
    TokenRecord, TokenRepository, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn insert_user(repo: &SqliteRepository, username: &str) -> UserId {
    repo.insert_user(NewUserRecord {
        username: Username::new(username).unwrap(),
        email: Email::new(format!("{username}@example.com")).unwrap(),
        password_hash: "hash".into(),
        role: UserRole::User,
        created_at: fixed_now(),
    })
    .await
    .unwrap()
}

async fn insert_deck(repo: &SqliteRepository, owner: UserId, draft: DeckDraft) -> DeckId {
    let deck = Deck::new(DeckId::new(0), owner, draft, fixed_now()).unwrap();
    repo.insert_new_deck(NewDeckRecord::from_deck(&deck))
        .await
        .unwrap()
}

fn card(deck_id: DeckId, owner: UserId, front: &str, difficulty: Difficulty) -> NewCardRecord {
    NewCardRecord {
        deck_id,
        owner_id: owner,
        content: CardDraft::new(front, "answer")
            .with_difficulty(difficulty)
            .with_tags(["rust"])
            .validate()
            .unwrap(),
        created_at: fixed_now(),
    }
}

#[tokio::test]
async fn users_are_unique_by_username() {
    let repo = connect("memdb_users").await;
    let id = insert_user(&repo, "alice").await;

    let dup = repo
        .insert_user(NewUserRecord {
            username: Username::new("alice").unwrap(),
            email: Email::new("other@example.com").unwrap(),
            password_hash: "hash".into(),
            role: UserRole::User,
            created_at: fixed_now(),
        })
        .await;
    assert!(matches!(dup, Err(StorageError::Conflict)));

    let creds = repo.find_credentials("alice").await.unwrap().unwrap();
    assert_eq!(creds.user.id(), id);
    assert_eq!(creds.password_hash, "hash");
    assert_eq!(repo.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn tokens_round_trip_and_expire() {
    let repo = connect("memdb_tokens").await;
    let user = insert_user(&repo, "bob").await;
    let token = TokenRecord {
        token: "t1".into(),
        user_id: user,
        created_at: fixed_now(),
        expires_at: fixed_now() + Duration::hours(1),
    };
    repo.insert_token(&token).await.unwrap();
    assert_eq!(repo.find_token("t1").await.unwrap(), Some(token));

    let purged = repo
        .delete_expired_tokens(fixed_now() + Duration::hours(2))
        .await
        .unwrap();
    assert_eq!(purged, 1);
    assert!(!repo.delete_token("t1").await.unwrap());
}

#[tokio::test]
async fn decks_persist_tags_and_visibility() {
    let repo = connect("memdb_decks").await;
    let owner = insert_user(&repo, "carol").await;
    let draft = DeckDraft::new("Spanish")
        .with_description("verbs")
        .with_visibility(Visibility::Public)
        .with_tags(["lang", "es"]);
    let id = insert_deck(&repo, owner, draft).await;
    insert_deck(&repo, owner, DeckDraft::new("Private")).await;

    let deck = repo.get_deck(id).await.unwrap().unwrap();
    assert_eq!(deck.name(), "Spanish");
    assert_eq!(deck.description(), Some("verbs"));
    assert!(deck.tags().contains("es"));
    assert_eq!(deck.card_count(), 0);

    assert_eq!(repo.list_decks_by_owner(owner).await.unwrap().len(), 2);
    let public = repo.list_public_decks().await.unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].id(), id);
}

#[tokio::test]
async fn cards_filter_by_difficulty_in_creation_order() {
    let repo = connect("memdb_cards").await;
    let owner = insert_user(&repo, "dave").await;
    let deck_id = insert_deck(&repo, owner, DeckDraft::new("Deck")).await;
    for (front, difficulty) in [
        ("one", Difficulty::Easy),
        ("two", Difficulty::Hard),
        ("three", Difficulty::Medium),
        ("four", Difficulty::Hard),
    ] {
        repo.insert_new_card(card(deck_id, owner, front, difficulty))
            .await
            .unwrap();
    }

    let all = repo.list_cards(deck_id, DifficultyFilter::All).await.unwrap();
    let fronts: Vec<_> = all.iter().map(|c| c.front().to_owned()).collect();
    assert_eq!(fronts, ["one", "two", "three", "four"]);

    let hard = repo
        .list_cards(deck_id, DifficultyFilter::Only(Difficulty::Hard))
        .await
        .unwrap();
    assert_eq!(hard.len(), 2);
    assert!(hard.iter().all(|c| c.difficulty() == Difficulty::Hard));
    assert_eq!(repo.count_cards_in_deck(deck_id).await.unwrap(), 4);
}

#[tokio::test]
async fn card_stats_are_overwritten_absolutely() {
    let repo = connect("memdb_stats").await;
    let owner = insert_user(&repo, "erin").await;
    let deck_id = insert_deck(&repo, owner, DeckDraft::new("Deck")).await;
    let id = repo
        .insert_new_card(card(deck_id, owner, "q", Difficulty::Medium))
        .await
        .unwrap();

    let stats = CardStats::new(5, 3, Some(fixed_now())).unwrap();
    repo.update_card_stats(id, stats, fixed_now()).await.unwrap();

    let fetched = repo.get_card(id).await.unwrap().unwrap();
    assert_eq!(*fetched.stats(), stats);
    assert_eq!(fetched.accuracy(), 60);
    assert!(fetched.tags().contains("rust"));
}

#[tokio::test]
async fn deleting_a_deck_removes_its_cards() {
    let repo = connect("memdb_cascade").await;
    let owner = insert_user(&repo, "frank").await;
    let deck_id = insert_deck(&repo, owner, DeckDraft::new("Deck")).await;
    let card_id = repo
        .insert_new_card(card(deck_id, owner, "q", Difficulty::Easy))
        .await
        .unwrap();

    repo.delete_deck(deck_id).await.unwrap();

    assert!(repo.get_deck(deck_id).await.unwrap().is_none());
    assert!(repo.get_card(card_id).await.unwrap().is_none());
    assert!(matches!(
        repo.delete_deck(deck_id).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.insert_new_card(card(deck_id, owner, "orphan", Difficulty::Easy))
            .await,
        Err(StorageError::NotFound)
    ));
}
