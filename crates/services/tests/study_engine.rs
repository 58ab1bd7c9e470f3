use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use flashdeck_core::model::{
    Card, CardDraft, CardId, CardStats, DeckId, Difficulty, DifficultyFilter, SessionError,
    SessionPhase, UserId,
};
use flashdeck_core::time::{fixed_clock, fixed_now};
use services::{CardStatsUpdate, CardStore, CardStoreError, StartSessionError, StudyEngine};

struct SpyStore {
    cards: Vec<Card>,
    fetches: AtomicUsize,
    fail_fetch: bool,
    fail_updates: bool,
    latency: Duration,
    updates: UnboundedSender<(CardId, CardStatsUpdate)>,
}

impl SpyStore {
    fn new(cards: Vec<Card>) -> (Arc<Self>, UnboundedReceiver<(CardId, CardStatsUpdate)>) {
        Self::build(cards, false, false)
    }

    fn build(
        cards: Vec<Card>,
        fail_fetch: bool,
        fail_updates: bool,
    ) -> (Arc<Self>, UnboundedReceiver<(CardId, CardStatsUpdate)>) {
        let (tx, rx) = unbounded_channel();
        let store = Arc::new(Self {
            cards,
            fetches: AtomicUsize::new(0),
            fail_fetch,
            fail_updates,
            latency: Duration::ZERO,
            updates: tx,
        });
        (store, rx)
    }

    /// Every stats update takes `latency` before it lands.
    fn slow(
        cards: Vec<Card>,
        latency: Duration,
    ) -> (Arc<Self>, UnboundedReceiver<(CardId, CardStatsUpdate)>) {
        let (tx, rx) = unbounded_channel();
        let store = Arc::new(Self {
            cards,
            fetches: AtomicUsize::new(0),
            fail_fetch: false,
            fail_updates: false,
            latency,
            updates: tx,
        });
        (store, rx)
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CardStore for SpyStore {
    async fn list_cards(
        &self,
        _deck_id: DeckId,
        filter: DifficultyFilter,
    ) -> Result<Vec<Card>, CardStoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(CardStoreError::Unauthorized);
        }
        Ok(self
            .cards
            .iter()
            .filter(|c| filter.matches(c.difficulty()))
            .cloned()
            .collect())
    }

    async fn update_card_stats(
        &self,
        card_id: CardId,
        update: CardStatsUpdate,
    ) -> Result<(), CardStoreError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let _ = self.updates.send((card_id, update));
        if self.fail_updates {
            return Err(CardStoreError::Unauthorized);
        }
        Ok(())
    }
}

fn card(id: u64, difficulty: Difficulty, stats: CardStats) -> Card {
    let mut card = CardDraft::new(format!("Q{id}"), format!("A{id}"))
        .with_difficulty(difficulty)
        .validate()
        .unwrap()
        .assign_id(CardId::new(id), DeckId::new(1), UserId::new(1), fixed_now());
    card.set_stats(stats, fixed_now());
    card
}

fn plain_deck(n: u64) -> Vec<Card> {
    (1..=n)
        .map(|id| card(id, Difficulty::Medium, CardStats::default()))
        .collect()
}

fn ids(cards: &[Card]) -> Vec<CardId> {
    cards.iter().map(Card::id).collect()
}

async fn next_update(
    rx: &mut UnboundedReceiver<(CardId, CardStatsUpdate)>,
) -> (CardId, CardStatsUpdate) {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("sync dispatched")
        .expect("channel open")
}

#[tokio::test]
async fn three_card_walkthrough_completes_with_rounded_accuracy() {
    let (store, mut rx) = SpyStore::new(plain_deck(3));
    let engine = StudyEngine::new(fixed_clock(), store.clone());

    let mut session = engine
        .start_session(DeckId::new(1), DifficultyFilter::All)
        .await
        .unwrap();
    assert_eq!(session.total_cards(), 3);
    assert_eq!(session.phase(), SessionPhase::Showing);
    let second = session.draw()[1].id();

    assert!(session.reveal());
    session.record_answer(true).unwrap();
    let stats = session.statistics();
    assert_eq!(stats.studied_cards(), 1);
    assert_eq!(stats.correct_answers(), 1);
    assert_eq!(session.cursor(), 1);
    assert!(!session.flipped());
    assert_eq!(session.current_card().unwrap().id(), second);

    session.reveal();
    session.record_answer(false).unwrap();
    session.reveal();
    let last = session.record_answer(true).unwrap();

    assert!(last.completed);
    assert_eq!(session.phase(), SessionPhase::Complete);
    let summary = session.summary();
    assert_eq!(summary.stats.studied_cards(), 3);
    assert_eq!(summary.stats.incorrect_answers(), 1);
    assert_eq!(summary.accuracy, 67);

    let mut synced = HashSet::new();
    for _ in 0..3 {
        synced.insert(next_update(&mut rx).await.0);
    }
    assert_eq!(synced.len(), 3);
    assert_eq!(store.fetch_count(), 1);
}

#[tokio::test]
async fn draw_is_a_permutation_of_the_fetched_set() {
    let (store, _rx) = SpyStore::new(plain_deck(12));
    let engine = StudyEngine::new(fixed_clock(), store);

    let session = engine
        .start_session_with_rng(
            DeckId::new(1),
            DifficultyFilter::All,
            &mut StdRng::seed_from_u64(11),
        )
        .await
        .unwrap();

    let mut drawn = ids(session.draw());
    drawn.sort();
    assert_eq!(drawn, ids(&plain_deck(12)));
}

#[tokio::test]
async fn hard_filter_draws_only_hard_cards() {
    let cards = vec![
        card(1, Difficulty::Easy, CardStats::default()),
        card(2, Difficulty::Hard, CardStats::default()),
        card(3, Difficulty::Medium, CardStats::default()),
        card(4, Difficulty::Hard, CardStats::default()),
        card(5, Difficulty::Easy, CardStats::default()),
    ];
    let (store, _rx) = SpyStore::new(cards);
    let engine = StudyEngine::new(fixed_clock(), store);

    let session = engine
        .start_session(DeckId::new(1), DifficultyFilter::Only(Difficulty::Hard))
        .await
        .unwrap();

    assert_eq!(session.total_cards(), 2);
    let drawn: HashSet<_> = ids(session.draw()).into_iter().collect();
    assert_eq!(drawn, HashSet::from([CardId::new(2), CardId::new(4)]));
}

#[tokio::test]
async fn empty_filtered_set_yields_no_session() {
    let (store, _rx) = SpyStore::new(plain_deck(3));
    let engine = StudyEngine::new(fixed_clock(), store);

    let result = engine
        .start_session(DeckId::new(1), DifficultyFilter::Only(Difficulty::Hard))
        .await;
    assert!(matches!(
        result,
        Err(StartSessionError::EmptySet { deck_id }) if deck_id == DeckId::new(1)
    ));
}

#[tokio::test]
async fn fetch_failure_yields_no_session() {
    let (store, _rx) = SpyStore::build(plain_deck(3), true, false);
    let engine = StudyEngine::new(fixed_clock(), store);

    let result = engine
        .start_session(DeckId::new(1), DifficultyFilter::All)
        .await;
    assert!(matches!(
        result,
        Err(StartSessionError::Fetch(CardStoreError::Unauthorized))
    ));
}

#[tokio::test]
async fn sync_payload_carries_post_increment_counts() {
    let existing = CardStats::new(4, 2, Some(fixed_now())).unwrap();
    let (store, mut rx) = SpyStore::new(vec![card(7, Difficulty::Easy, existing)]);
    let engine = StudyEngine::new(fixed_clock(), store);

    let mut session = engine
        .start_session(DeckId::new(1), DifficultyFilter::All)
        .await
        .unwrap();
    session.reveal();
    session.record_answer(true).unwrap();

    let (card_id, update) = next_update(&mut rx).await;
    assert_eq!(card_id, CardId::new(7));
    assert_eq!(update.study_count, 5);
    assert_eq!(update.correct_count, 3);
    assert_eq!(update.last_studied, fixed_now());
}

#[tokio::test]
async fn restart_never_refetches_or_reshuffles() {
    let (store, mut rx) = SpyStore::new(plain_deck(4));
    let engine = StudyEngine::new(fixed_clock(), store.clone());

    let mut session = engine
        .start_session(DeckId::new(1), DifficultyFilter::All)
        .await
        .unwrap();
    let order = ids(session.draw());
    let first = session.draw()[0].id();

    for _ in 0..3 {
        session.reveal();
        session.record_answer(true).unwrap();
        session.restart();

        assert_eq!(session.cursor(), 0);
        assert_eq!(session.statistics().studied_cards(), 0);
        assert_eq!(session.statistics().total_cards(), 4);
        assert_eq!(ids(session.draw()), order);
    }
    assert_eq!(store.fetch_count(), 1);

    let mut counts = Vec::new();
    for _ in 0..3 {
        let (id, update) = next_update(&mut rx).await;
        assert_eq!(id, first);
        counts.push(update.study_count);
    }
    counts.sort_unstable();
    assert_eq!(counts, [1, 2, 3]);
}

#[tokio::test]
async fn failed_sync_does_not_interrupt_the_session() {
    let (store, mut rx) = SpyStore::build(plain_deck(2), false, true);
    let engine = StudyEngine::new(fixed_clock(), store);

    let mut session = engine
        .start_session(DeckId::new(1), DifficultyFilter::All)
        .await
        .unwrap();
    session.reveal();
    session.record_answer(false).unwrap();
    next_update(&mut rx).await;

    assert_eq!(session.cursor(), 1);
    assert_eq!(
        session.record_answer(true).unwrap_err(),
        SessionError::NotRevealed
    );
    session.reveal();
    assert!(session.record_answer(true).unwrap().completed);
    assert_eq!(session.end().accuracy, 50);
}

#[tokio::test]
async fn finish_waits_for_in_flight_syncs() {
    let (store, mut rx) = SpyStore::slow(plain_deck(2), Duration::from_millis(50));
    let engine = StudyEngine::new(fixed_clock(), store);

    let mut session = engine
        .start_session(DeckId::new(1), DifficultyFilter::All)
        .await
        .unwrap();
    for correct in [true, false] {
        session.reveal();
        session.record_answer(correct).unwrap();
    }
    assert_eq!(session.pending_syncs(), 2);

    let summary = session.finish(Duration::from_secs(2)).await;
    assert_eq!(summary.accuracy, 50);
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn finish_stops_waiting_at_the_deadline() {
    let (store, mut rx) = SpyStore::slow(plain_deck(1), Duration::from_secs(5));
    let engine = StudyEngine::new(fixed_clock(), store);

    let mut session = engine
        .start_session(DeckId::new(1), DifficultyFilter::All)
        .await
        .unwrap();
    session.reveal();
    session.record_answer(true).unwrap();

    let started = std::time::Instant::now();
    let summary = session.finish(Duration::from_millis(20)).await;
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(summary.stats.studied_cards(), 1);
    assert!(rx.try_recv().is_err());
}
