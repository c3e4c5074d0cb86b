//! Application state: catalog, museum client, score store and live game sessions.
//!
//! Sessions sit behind a tokio `RwLock`; every event (new round, fetch resolved,
//! activation) takes the write lock for the duration of one state transition.
//! Score store I/O runs on the blocking pool after that lock is released.
//!
//! HTTP sessions are bounded: idle ones are swept periodically and the least recently
//! used one is evicted when `max_sessions` is reached. Socket sessions live as long as
//! their connection.

use std::{
  collections::HashMap,
  sync::Arc,
  time::{Duration, Instant},
};

use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::catalog::{load_catalog, log_inventory};
use crate::config::GameConfig;
use crate::domain::{ArtworkId, ArtworkMetadata, Catalog, MembershipCode, ScoreCounts, ROUND_SIZE};
use crate::error::{ApiError, ConfigError, FetchError, StoreError};
use crate::met::MetClient;
use crate::round::generate_round;
use crate::score::ScoreTracker;
use crate::seeds::seed_catalog;
use crate::session::{Activation, GameSession, Resolution};
use crate::store::{CounterStore, FileCounterStore, MemoryCounterStore};

/// What a caller needs to dispatch the fetches of a freshly generated round.
#[derive(Debug, Clone)]
pub struct RoundTicket {
  pub session_id: String,
  pub generation: u64,
  pub artwork_ids: [ArtworkId; ROUND_SIZE],
}

const SWEEP_EVERY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
  pub idle_ttl: Duration,
  pub max_sessions: usize,
}

impl Default for SessionLimits {
  fn default() -> Self {
    Self { idle_ttl: Duration::from_secs(30 * 60), max_sessions: 10_000 }
  }
}

#[derive(Clone)]
pub struct AppState {
  pub catalog: Arc<Catalog>,
  pub met: MetClient,
  pub scores: Arc<dyn CounterStore>,
  pub sessions: Arc<RwLock<HashMap<String, GameSession>>>,
  pub limits: SessionLimits,
  pub static_dir: String,
}

impl AppState {
  pub fn new(catalog: Catalog, met: MetClient, scores: Arc<dyn CounterStore>, static_dir: impl Into<String>) -> Self {
    Self {
      catalog: Arc::new(catalog),
      met,
      scores,
      sessions: Arc::new(RwLock::new(HashMap::new())),
      limits: SessionLimits::default(),
      static_dir: static_dir.into(),
    }
  }

  pub fn with_limits(mut self, limits: SessionLimits) -> Self {
    self.limits = limits;
    self
  }

  /// Build state from config: catalog file or seeds, score file or memory, museum client.
  #[instrument(level = "info", skip_all)]
  pub fn from_config(cfg: &GameConfig) -> Result<Self, ConfigError> {
    let catalog = match &cfg.catalog_path {
      Some(path) => load_catalog(path)?,
      None => {
        info!(target: "odd_art_out", "No CATALOG_PATH; using built-in seed catalog");
        seed_catalog()
      }
    };
    log_inventory(&catalog);

    let scores: Arc<dyn CounterStore> = match &cfg.scores_path {
      Some(path) => {
        info!(target: "odd_art_out", %path, "Persisting scores to file");
        Arc::new(FileCounterStore::open(path)?)
      }
      None => {
        warn!(target: "odd_art_out", "No SCORES_PATH; scores are kept in memory only");
        Arc::new(MemoryCounterStore::new())
      }
    };

    let met = MetClient::new(cfg.met_base_url.clone(), Duration::from_secs(cfg.request_timeout_secs))
      .map_err(|e| ConfigError::Client(e.to_string()))?;
    info!(target: "odd_art_out", base_url = %met.base_url, "Museum API client ready");

    let limits = SessionLimits {
      idle_ttl: Duration::from_secs(cfg.session_idle_secs),
      max_sessions: cfg.max_sessions.max(1),
    };
    Ok(Self::new(catalog, met, scores, cfg.static_dir.clone()).with_limits(limits))
  }

  pub fn tracker(&self, player: &str) -> ScoreTracker {
    ScoreTracker::new(self.scores.clone(), player)
  }

  /// Run a store operation on the blocking pool; the file store writes to disk.
  async fn with_tracker<T, F>(&self, player: &str, f: F) -> Result<T, StoreError>
  where
    T: Send + 'static,
    F: FnOnce(&ScoreTracker) -> Result<T, StoreError> + Send + 'static,
  {
    let tracker = self.tracker(player);
    tokio::task::spawn_blocking(move || f(&tracker))
      .await
      .map_err(|e| StoreError::Task(e.to_string()))?
  }

  pub async fn counts(&self, player: &str) -> Result<ScoreCounts, ApiError> {
    Ok(self.with_tracker(player, |t| t.counts()).await?)
  }

  pub async fn record_guess(&self, player: &str, code: MembershipCode) -> Result<ScoreCounts, StoreError> {
    self.with_tracker(player, move |t| t.record_guess(code)).await
  }

  /// Register the session owned by a WebSocket connection.
  pub async fn open_socket_session(&self, session_id: &str, player_id: &str) {
    let session = GameSession::for_socket(session_id, player_id);
    self.sessions.write().await.insert(session_id.to_string(), session);
  }

  /// Generate a round for `session_id`, creating the session if needed.
  ///
  /// An existing session keeps the player it was created for; naming another player
  /// is rejected with `PlayerMismatch`.
  #[instrument(level = "info", skip(self))]
  pub async fn start_round(
    &self,
    session_id: Option<String>,
    player_id: Option<String>,
  ) -> Result<RoundTicket, ApiError> {
    let round = generate_round(&self.catalog, &mut rand::thread_rng())?;
    let artwork_ids = round.artwork_ids;

    let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut sessions = self.sessions.write().await;
    if let Some(existing) = sessions.get(&session_id) {
      if let Some(given) = player_id.filter(|p| *p != existing.player) {
        return Err(ApiError::PlayerMismatch { session: session_id, expected: existing.player.clone(), given });
      }
    } else {
      if sessions.len() >= self.limits.max_sessions {
        if let Some(evicted) = evict_least_recent(&mut sessions) {
          debug!(target: "round", session = %evicted, "Session limit reached; evicted least recently used");
        }
      }
      let player = player_id.unwrap_or_else(|| session_id.clone());
      info!(target: "round", session = %session_id, %player, "Session created");
      sessions.insert(session_id.clone(), GameSession::new(session_id.clone(), player));
    }
    let session = sessions
      .get_mut(&session_id)
      .ok_or_else(|| ApiError::UnknownSession(session_id.clone()))?;
    let generation = session.start_round(round);
    info!(target: "round", session = %session_id, generation, ?artwork_ids, "New round");
    Ok(RoundTicket { session_id, generation, artwork_ids })
  }

  pub async fn apply_fetch(
    &self,
    session_id: &str,
    generation: u64,
    index: usize,
    result: Result<ArtworkMetadata, FetchError>,
  ) -> Resolution {
    let mut sessions = self.sessions.write().await;
    match sessions.get_mut(session_id) {
      Some(session) => session.apply_fetch(generation, index, result),
      None => Resolution::Stale,
    }
  }

  /// Apply an activation and return the outcome plus the player id it was scored for.
  ///
  /// The reveal flips under the sessions lock; the guess is written after it is released.
  /// A failed write leaves the round revealed and returns the store error.
  pub async fn activate(&self, session_id: &str, index: usize) -> Result<(Activation, String), ApiError> {
    let (outcome, player) = {
      let mut sessions = self.sessions.write().await;
      let session = sessions
        .get_mut(session_id)
        .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))?;
      (session.activate(index)?, session.player.clone())
    };
    if let Activation::Scored(code) = outcome {
      self.record_guess(&player, code).await?;
    }
    Ok((outcome, player))
  }

  /// Run `f` against a session under the read lock.
  pub async fn with_session<T>(&self, session_id: &str, f: impl FnOnce(&GameSession) -> T) -> Result<T, ApiError> {
    let sessions = self.sessions.read().await;
    sessions
      .get(session_id)
      .map(f)
      .ok_or_else(|| ApiError::UnknownSession(session_id.to_string()))
  }

  pub async fn end_session(&self, session_id: &str) {
    self.sessions.write().await.remove(session_id);
  }

  /// Drop HTTP sessions idle for at least `idle_ttl` as of `now`. Returns how many went.
  pub async fn evict_idle(&self, now: Instant) -> usize {
    let ttl = self.limits.idle_ttl;
    let mut sessions = self.sessions.write().await;
    let before = sessions.len();
    sessions.retain(|_, s| s.is_live() || s.idle_for(now) < ttl);
    let evicted = before - sessions.len();
    if evicted > 0 {
      info!(target: "round", evicted, remaining = sessions.len(), "Idle sessions evicted");
    }
    evicted
  }

  /// Sweep idle sessions in the background for the life of the process.
  pub fn spawn_idle_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
    let state = Arc::clone(self);
    tokio::spawn(async move {
      let mut tick = tokio::time::interval(SWEEP_EVERY);
      loop {
        tick.tick().await;
        state.evict_idle(Instant::now()).await;
      }
    })
  }
}

fn evict_least_recent(sessions: &mut HashMap<String, GameSession>) -> Option<String> {
  let oldest = sessions
    .values()
    .filter(|s| !s.is_live())
    .min_by_key(|s| s.last_seen())?
    .id
    .clone();
  sessions.remove(&oldest);
  Some(oldest)
}

#[cfg(test)]
mod tests {
  use std::collections::BTreeMap;
  use std::sync::atomic::{AtomicBool, Ordering};

  use super::*;
  use crate::domain::RevealState;
  use crate::store::MemoryCounterStore;

  fn state_with(store: Arc<dyn CounterStore>) -> AppState {
    let catalog = Catalog::new(BTreeMap::from([
      ("Monet".to_string(), vec![101]),
      ("Degas".to_string(), vec![201, 202, 203, 204]),
    ]));
    // Nothing listens here; these tests apply fetch results by hand.
    let met = MetClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
    AppState::new(catalog, met, store, "./static")
  }

  fn monet() -> ArtworkMetadata {
    ArtworkMetadata {
      id: 101,
      image_url: "https://img/101.jpg".into(),
      alt_text: String::new(),
      artist_display_name: "Monet".into(),
      title: "Water Lilies".into(),
      year: 1899,
    }
  }

  /// Start a round for `session` and resolve its Monet slot; returns that slot's index.
  async fn round_with_monet(state: &AppState, session: &str, player: &str) -> usize {
    let ticket = state.start_round(Some(session.into()), Some(player.into())).await.unwrap();
    let index = ticket.artwork_ids.iter().position(|id| *id == 101).unwrap();
    let applied = state.apply_fetch(session, ticket.generation, index, Ok(monet())).await;
    assert_eq!(applied, Resolution::Applied);
    index
  }

  /// Memory store whose increments take a while and can be observed mid-write.
  struct SlowStore {
    inner: MemoryCounterStore,
    writing: AtomicBool,
    delay: Duration,
  }

  impl CounterStore for SlowStore {
    fn get(&self, key: &str) -> Result<u64, StoreError> {
      self.inner.get(key)
    }

    fn set(&self, key: &str, value: u64) -> Result<(), StoreError> {
      self.inner.set(key, value)
    }

    fn increment(&self, key: &str) -> Result<u64, StoreError> {
      self.writing.store(true, Ordering::SeqCst);
      std::thread::sleep(self.delay);
      self.inner.increment(key)
    }
  }

  struct BrokenStore;

  impl CounterStore for BrokenStore {
    fn get(&self, _: &str) -> Result<u64, StoreError> {
      Ok(0)
    }

    fn set(&self, _: &str, _: u64) -> Result<(), StoreError> {
      Err(StoreError::Poisoned)
    }

    fn increment(&self, _: &str) -> Result<u64, StoreError> {
      Err(StoreError::Poisoned)
    }
  }

  #[tokio::test]
  async fn existing_session_rejects_another_player() {
    let state = state_with(Arc::new(MemoryCounterStore::new()));
    state.start_round(Some("s".into()), Some("alice".into())).await.unwrap();

    let err = state.start_round(Some("s".into()), Some("bob".into())).await.unwrap_err();
    assert!(matches!(err, ApiError::PlayerMismatch { ref expected, ref given, .. } if expected == "alice" && given == "bob"));

    // Same player, or none named, keeps playing the session.
    assert_eq!(state.start_round(Some("s".into()), Some("alice".into())).await.unwrap().generation, 2);
    assert_eq!(state.start_round(Some("s".into()), None).await.unwrap().generation, 3);
    assert_eq!(state.with_session("s", |s| s.player.clone()).await.unwrap(), "alice");
  }

  #[tokio::test]
  async fn anonymous_rounds_stay_within_the_session_limit() {
    let limits = SessionLimits { idle_ttl: Duration::from_secs(60), max_sessions: 50 };
    let state = state_with(Arc::new(MemoryCounterStore::new())).with_limits(limits);
    state.open_socket_session("socket", "p").await;

    let mut last = None;
    for _ in 0..500 {
      last = Some(state.start_round(None, None).await.unwrap().session_id);
    }
    let sessions = state.sessions.read().await;
    assert_eq!(sessions.len(), 50);
    // The socket session is never the one making room.
    assert!(sessions.contains_key("socket"));
    assert!(sessions.contains_key(&last.unwrap()));
  }

  #[tokio::test]
  async fn idle_http_sessions_are_swept_and_sockets_kept() {
    let limits = SessionLimits { idle_ttl: Duration::from_secs(60), max_sessions: 100 };
    let state = state_with(Arc::new(MemoryCounterStore::new())).with_limits(limits);
    state.open_socket_session("socket", "p").await;
    for id in ["a", "b", "c"] {
      state.start_round(Some(id.into()), None).await.unwrap();
    }

    assert_eq!(state.evict_idle(Instant::now()).await, 0);
    assert_eq!(state.evict_idle(Instant::now() + Duration::from_secs(61)).await, 3);
    let sessions = state.sessions.read().await;
    assert_eq!(sessions.keys().collect::<Vec<_>>(), vec!["socket"]);
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
  async fn score_write_runs_after_the_sessions_lock_is_released() {
    let store = Arc::new(SlowStore {
      inner: MemoryCounterStore::new(),
      writing: AtomicBool::new(false),
      delay: Duration::from_millis(500),
    });
    let state = Arc::new(state_with(store.clone()));
    let index = round_with_monet(&state, "a", "pa").await;
    state.start_round(Some("b".into()), Some("pb".into())).await.unwrap();

    let writer = {
      let state = state.clone();
      tokio::spawn(async move { state.activate("a", index).await })
    };
    while !store.writing.load(Ordering::SeqCst) {
      tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // Another session stays readable while the guess is being written.
    let other = tokio::time::timeout(Duration::from_millis(200), state.with_session("b", |s| s.generation())).await;
    assert_eq!(other.expect("sessions lock held during score write").unwrap(), 1);

    let (outcome, player) = writer.await.unwrap().unwrap();
    assert_eq!(outcome, Activation::Scored(MembershipCode::Correct));
    assert_eq!(player, "pa");
    assert_eq!(state.counts("pa").await.unwrap(), ScoreCounts { correct: 1, incorrect: 0 });
  }

  #[tokio::test]
  async fn failed_score_write_still_reveals_once() {
    let state = state_with(Arc::new(BrokenStore));
    let index = round_with_monet(&state, "s", "p").await;

    assert!(matches!(state.activate("s", index).await, Err(ApiError::Store(StoreError::Poisoned))));
    assert_eq!(state.with_session("s", |s| s.reveal()).await.unwrap(), RevealState::Revealed);
    let (again, _) = state.activate("s", index).await.unwrap();
    assert_eq!(again, Activation::AlreadyRevealed);
  }
}
