//! The pending queue of prefetched cards.
//!
//! A [`DeckManager`] owns the deck for one active query. `start` fills it with
//! a sequential, rate-limited batch; `advance` pops the front card and tops
//! the queue up in the background once it runs low. Every spawned fetch task
//! carries the generation it was started under and stops touching the deck as
//! soon as a newer `start` or a `cancel` bumps the generation.

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::card::Card;
use crate::providers::{CardSource, ProviderResult};

/// What the UI should show for the deck
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckStatus {
    Empty,
    Loading,
    Ready,
    Refilling,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckSettings {
    pub batch_size: usize,
    pub low_water_mark: usize,
    /// Pause between consecutive requests of one batch
    pub request_delay: Duration,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            low_water_mark: 5,
            request_delay: Duration::from_millis(75),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Empty,
    Loading,
    Ready,
    Error(String),
}

struct DeckState {
    cards: VecDeque<Card>,
    phase: Phase,
    query: Option<String>,
    generation: u64,
    refilling: bool,
}

impl DeckState {
    fn status(&self) -> DeckStatus {
        match &self.phase {
            Phase::Loading => DeckStatus::Loading,
            Phase::Error(message) => DeckStatus::Error(message.clone()),
            Phase::Empty | Phase::Ready if self.refilling => DeckStatus::Refilling,
            Phase::Empty | Phase::Ready if self.cards.is_empty() => DeckStatus::Empty,
            Phase::Empty | Phase::Ready => DeckStatus::Ready,
        }
    }
}

struct Shared {
    source: Arc<dyn CardSource>,
    settings: DeckSettings,
    state: Mutex<DeckState>,
    status_tx: watch::Sender<DeckStatus>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DeckState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn publish(&self, state: &DeckState) {
        self.status_tx.send_replace(state.status());
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Fetch `count` cards one at a time, handing each to `on_card`.
    ///
    /// Stops early, returning `Ok(false)`, once `generation` is stale or
    /// `on_card` declines the card.
    async fn fetch_sequential<F>(
        &self,
        query: &str,
        count: usize,
        generation: u64,
        mut on_card: F,
    ) -> ProviderResult<bool>
    where
        F: FnMut(Card) -> bool,
    {
        for n in 0..count {
            if n > 0 && !self.settings.request_delay.is_zero() {
                tokio::time::sleep(self.settings.request_delay).await;
            }
            if !self.is_current(generation) {
                debug!("Dropping superseded fetch for '{}' at {}/{}", query, n, count);
                return Ok(false);
            }
            let card = self.source.fetch_card(query).await?;
            debug!("Fetched {} ({}/{})", card.name, n + 1, count);
            if !on_card(card) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    async fn run_prefetch(self: Arc<Self>, query: String, generation: u64) {
        let count = self.settings.batch_size;
        info!("Prefetching {} cards for '{}'", count, query);

        let mut batch = Vec::with_capacity(count);
        let result = self
            .fetch_sequential(&query, count, generation, |card| {
                batch.push(card);
                true
            })
            .await;

        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        match result {
            Ok(true) => {
                info!("Deck ready with {} cards", batch.len());
                state.cards = batch.into();
                state.phase = Phase::Ready;
            }
            Ok(false) => return,
            Err(e) => {
                warn!("Prefetch for '{}' failed: {}", query, e);
                state.cards.clear();
                state.phase = Phase::Error(e.user_message());
            }
        }
        self.publish(&state);
    }

    async fn run_refill(self: Arc<Self>, query: String, count: usize, generation: u64) {
        info!("Refilling deck with {} cards", count);

        let result = self
            .fetch_sequential(&query, count, generation, |card| {
                let mut state = self.lock();
                if state.generation != generation {
                    return false;
                }
                state.cards.push_back(card);
                self.publish(&state);
                true
            })
            .await;

        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        if let Err(e) = result {
            warn!("Background refill failed, will retry on next swipe: {}", e);
        }
        state.refilling = false;
        self.publish(&state);
    }
}

/// Owner of the deck; cheap to share behind an `Arc`
pub struct DeckManager {
    shared: Arc<Shared>,
}

impl DeckManager {
    pub fn new(source: Arc<dyn CardSource>, settings: DeckSettings) -> Self {
        let (status_tx, _) = watch::channel(DeckStatus::Empty);
        let state = DeckState {
            cards: VecDeque::new(),
            phase: Phase::Empty,
            query: None,
            generation: 0,
            refilling: false,
        };

        Self {
            shared: Arc::new(Shared {
                source,
                settings,
                state: Mutex::new(state),
                status_tx,
            }),
        }
    }

    pub fn settings(&self) -> DeckSettings {
        self.shared.settings
    }

    /// Replace the deck with a fresh batch for `query`.
    ///
    /// Any prefetch or refill still running for an earlier query is
    /// superseded. Must be called from within a Tokio runtime.
    pub fn start(&self, query: impl Into<String>) -> JoinHandle<()> {
        let query = query.into();
        let generation = {
            let mut state = self.shared.lock();
            state.generation += 1;
            state.cards.clear();
            state.refilling = false;
            state.phase = Phase::Loading;
            state.query = Some(query.clone());
            self.shared.publish(&state);
            state.generation
        };

        tokio::spawn(Arc::clone(&self.shared).run_prefetch(query, generation))
    }

    /// Stop in-flight fetches. Results still arriving are dropped.
    pub fn cancel(&self) {
        let mut state = self.shared.lock();
        state.generation += 1;
        state.refilling = false;
        if state.phase == Phase::Loading {
            state.phase = Phase::Empty;
        }
        self.shared.publish(&state);
    }

    pub fn current(&self) -> Option<Card> {
        self.shared.lock().cards.front().cloned()
    }

    /// Pop the front card, starting a background refill if the deck ran low.
    ///
    /// A drained `Ready` deck still schedules a refill, so a deck emptied by
    /// failed refills recovers on the next call.
    pub fn advance(&self) -> Option<Card> {
        let mut state = self.shared.lock();
        let len_before = state.cards.len();
        let card = state.cards.pop_front();

        let settings = self.shared.settings;
        let remaining = state.cards.len();
        let needs_refill = (remaining < settings.low_water_mark || remaining == 0)
            && !state.refilling
            && state.phase == Phase::Ready;
        // The swiped card still counts toward the target while it leaves the screen
        let count = settings.batch_size.saturating_sub(len_before).max(1);

        let mut refill_started = false;
        if needs_refill {
            if let Some(query) = state.query.clone() {
                state.refilling = true;
                refill_started = true;
                let generation = state.generation;
                tokio::spawn(Arc::clone(&self.shared).run_refill(query, count, generation));
            }
        }
        if card.is_some() || refill_started {
            self.shared.publish(&state);
        }
        card
    }

    pub fn status(&self) -> DeckStatus {
        self.shared.lock().status()
    }

    /// Watch status changes; the current value is available immediately
    pub fn subscribe(&self) -> watch::Receiver<DeckStatus> {
        self.shared.status_tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().cards.is_empty()
    }

    pub fn query(&self) -> Option<String> {
        self.shared.lock().query.clone()
    }

    /// Names currently queued, front first
    pub fn queued_names(&self) -> Vec<String> {
        self.shared
            .lock()
            .cards
            .iter()
            .map(|card| card.name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    /// Upstream double: names cards `<query>-<n>`, optionally failing on one
    /// call and optionally holding calls for one query until permits arrive.
    struct ScriptedSource {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_on_call: Option<usize>,
        outage: Option<(usize, usize)>,
        gated_query: Option<String>,
        gate: Semaphore,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_on_call: None,
                outage: None,
                gated_query: None,
                gate: Semaphore::new(0),
            }
        }

        fn failing_on(call: usize) -> Self {
            Self {
                fail_on_call: Some(call),
                ..Self::new()
            }
        }

        /// Calls `first..=last` all fail
        fn failing_between(first: usize, last: usize) -> Self {
            Self {
                outage: Some((first, last)),
                ..Self::new()
            }
        }

        fn gated(query: &str) -> Self {
            Self {
                gated_query: Some(query.to_string()),
                ..Self::new()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn open_gate(&self) {
            self.gate.add_permits(1_000);
        }
    }

    #[async_trait]
    impl CardSource for ScriptedSource {
        async fn fetch_card(&self, query: &str) -> ProviderResult<Card> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if self.gated_query.as_deref() == Some(query) {
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
            }
            tokio::task::yield_now().await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let in_outage = matches!(self.outage, Some((first, last)) if (first..=last).contains(&call));
            if self.fail_on_call == Some(call) || in_outage {
                return Err(ProviderError::NetworkError("connection reset".to_string()));
            }
            Ok(Card::new(format!("{}-{}", query, call), format!("https://img/{}.png", call)))
        }
    }

    fn fast_settings() -> DeckSettings {
        DeckSettings {
            request_delay: Duration::ZERO,
            ..DeckSettings::default()
        }
    }

    fn manager(source: &Arc<ScriptedSource>) -> DeckManager {
        let source: Arc<dyn CardSource> = source.clone();
        DeckManager::new(source, fast_settings())
    }

    /// Put the manager straight into `Ready` with `n` queued cards
    fn seed(deck: &DeckManager, query: &str, n: usize) {
        let mut state = deck.shared.lock();
        state.query = Some(query.to_string());
        state.phase = Phase::Ready;
        state.cards = (0..n)
            .map(|i| Card::new(format!("seed-{}", i), format!("https://img/seed-{}.png", i)))
            .collect();
        deck.shared.publish(&state);
    }

    async fn settle() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_start_fetches_full_batch_in_order() {
        let source = Arc::new(ScriptedSource::new());
        let deck = manager(&source);

        deck.start("q").await.unwrap();

        assert_eq!(deck.status(), DeckStatus::Ready);
        assert_eq!(deck.len(), 10);
        let expected: Vec<String> = (1..=10).map(|n| format!("q-{}", n)).collect();
        assert_eq!(deck.queued_names(), expected);
        assert_eq!(deck.current().unwrap().name, "q-1");
    }

    #[tokio::test]
    async fn test_start_is_sequential() {
        let source = Arc::new(ScriptedSource::new());
        let deck = manager(&source);

        deck.start("q").await.unwrap();

        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_mid_batch_discards_partial_deck() {
        let source = Arc::new(ScriptedSource::failing_on(3));
        let deck = manager(&source);

        deck.start("q").await.unwrap();

        assert!(matches!(deck.status(), DeckStatus::Error(_)));
        assert!(deck.is_empty());
        assert!(deck.current().is_none());
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_upstream_error_message() {
        struct NoMatches;

        #[async_trait]
        impl CardSource for NoMatches {
            async fn fetch_card(&self, _query: &str) -> ProviderResult<Card> {
                Err(ProviderError::UpstreamError("No cards found".to_string()))
            }
        }

        let deck = DeckManager::new(Arc::new(NoMatches), fast_settings());
        deck.start("is:commander id<=W -id:c cmc>=7").await.unwrap();

        assert_eq!(
            deck.status(),
            DeckStatus::Error("No cards match these filters.".to_string())
        );
    }

    #[tokio::test]
    async fn test_refill_fetches_remaining_target_once() {
        let source = Arc::new(ScriptedSource::gated("q"));
        let deck = manager(&source);
        seed(&deck, "q", 4);

        assert_eq!(deck.advance().unwrap().name, "seed-0");
        settle().await;
        assert_eq!(deck.status(), DeckStatus::Refilling);
        assert_eq!(source.calls(), 1);

        // Second swipe while the refill is held: no second refill
        deck.advance();
        settle().await;
        assert_eq!(source.calls(), 1);

        source.open_gate();
        let mut rx = deck.subscribe();
        rx.wait_for(|s| *s == DeckStatus::Ready).await.unwrap();

        assert_eq!(source.calls(), 6);
        let expected: Vec<String> = ["seed-2", "seed-3"]
            .iter()
            .map(|s| s.to_string())
            .chain((1..=6).map(|n| format!("q-{}", n)))
            .collect();
        assert_eq!(deck.queued_names(), expected);
    }

    #[tokio::test]
    async fn test_no_refill_above_low_water_mark() {
        let source = Arc::new(ScriptedSource::new());
        let deck = manager(&source);
        seed(&deck, "q", 10);

        deck.advance();
        settle().await;

        assert_eq!(source.calls(), 0);
        assert_eq!(deck.len(), 9);
        assert_eq!(deck.status(), DeckStatus::Ready);
    }

    #[tokio::test]
    async fn test_refill_failure_is_silent_and_retried() {
        let source = Arc::new(ScriptedSource::failing_on(1));
        let deck = manager(&source);
        seed(&deck, "q", 4);

        deck.advance();
        let mut rx = deck.subscribe();
        rx.wait_for(|s| *s == DeckStatus::Ready).await.unwrap();
        assert_eq!(deck.len(), 3);
        assert_eq!(source.calls(), 1);

        // Next swipe below the mark tries again, sized to 10 - 3
        deck.advance();
        rx.wait_for(|s| *s == DeckStatus::Ready).await.unwrap();
        assert_eq!(source.calls(), 1 + 7);
        assert_eq!(deck.len(), 2 + 7);
    }

    #[tokio::test]
    async fn test_advance_on_empty_deck_is_noop() {
        let source = Arc::new(ScriptedSource::new());
        let deck = manager(&source);

        assert!(deck.advance().is_none());
        settle().await;
        assert_eq!(source.calls(), 0);
        assert_eq!(deck.status(), DeckStatus::Empty);
    }

    #[tokio::test]
    async fn test_drained_deck_recovers_after_outage() {
        let source = Arc::new(ScriptedSource::failing_between(11, 15));
        let deck = manager(&source);
        deck.start("q").await.unwrap();

        // Every refill attempt while swiping the batch away fails
        for _ in 0..10 {
            assert!(deck.advance().is_some());
            settle().await;
        }
        assert!(deck.is_empty());
        assert_eq!(source.calls(), 15);
        assert_eq!(deck.status(), DeckStatus::Empty);

        // Upstream is back: a swipe on the empty deck fetches a full batch
        assert!(deck.advance().is_none());
        let mut rx = deck.subscribe();
        rx.wait_for(|s| *s == DeckStatus::Ready).await.unwrap();
        assert_eq!(deck.len(), 10);
        assert_eq!(source.calls(), 25);
        assert_eq!(deck.current().unwrap().name, "q-16");
    }

    #[tokio::test]
    async fn test_refill_when_low_water_mark_equals_batch_size() {
        let source = Arc::new(ScriptedSource::new());
        let settings = DeckSettings {
            batch_size: 1,
            low_water_mark: 1,
            request_delay: Duration::ZERO,
        };
        let dyn_source: Arc<dyn CardSource> = source.clone();
        let deck = DeckManager::new(dyn_source, settings);
        assert_eq!(deck.settings(), settings);

        deck.start("q").await.unwrap();
        assert_eq!(deck.advance().unwrap().name, "q-1");
        let mut rx = deck.subscribe();
        rx.wait_for(|s| *s == DeckStatus::Ready).await.unwrap();

        assert_eq!(deck.queued_names(), vec!["q-2".to_string()]);
    }

    #[tokio::test]
    async fn test_no_refill_while_loading_or_errored() {
        let source = Arc::new(ScriptedSource::failing_on(1));
        let deck = manager(&source);
        deck.start("q").await.unwrap();
        assert!(matches!(deck.status(), DeckStatus::Error(_)));

        assert!(deck.advance().is_none());
        settle().await;
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_new_query_supersedes_old_prefetch() {
        let source = Arc::new(ScriptedSource::gated("old"));
        let deck = manager(&source);

        let old = deck.start("old");
        settle().await;
        assert_eq!(deck.status(), DeckStatus::Loading);

        let new = deck.start("new");
        new.await.unwrap();
        source.open_gate();
        old.await.unwrap();

        assert_eq!(deck.status(), DeckStatus::Ready);
        assert_eq!(deck.len(), 10);
        assert!(deck.queued_names().iter().all(|name| name.starts_with("new-")));
        assert_eq!(deck.query().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_start_supersedes_running_refill() {
        let source = Arc::new(ScriptedSource::gated("old"));
        let deck = manager(&source);
        seed(&deck, "old", 4);

        deck.advance();
        settle().await;
        assert_eq!(deck.status(), DeckStatus::Refilling);

        deck.start("new").await.unwrap();
        source.open_gate();
        settle().await;

        assert_eq!(deck.len(), 10);
        assert!(deck.queued_names().iter().all(|name| name.starts_with("new-")));
        assert_eq!(deck.status(), DeckStatus::Ready);
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight_results() {
        let source = Arc::new(ScriptedSource::gated("q"));
        let deck = manager(&source);

        let handle = deck.start("q");
        settle().await;
        deck.cancel();
        assert_eq!(deck.status(), DeckStatus::Empty);

        source.open_gate();
        handle.await.unwrap();

        assert!(deck.is_empty());
        assert_eq!(deck.status(), DeckStatus::Empty);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_request_delay_between_requests() {
        let source = Arc::new(ScriptedSource::new());
        let settings = DeckSettings {
            batch_size: 3,
            low_water_mark: 1,
            request_delay: Duration::from_millis(20),
        };
        let dyn_source: Arc<dyn CardSource> = source.clone();
        let deck = DeckManager::new(dyn_source, settings);

        let started = std::time::Instant::now();
        deck.start("q").await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(40));
        assert_eq!(deck.len(), 3);
    }
}
