//! Guess counters on top of a `CounterStore`.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::{MembershipCode, ScoreCounts};
use crate::error::StoreError;
use crate::store::CounterStore;

const CORRECT_KEY: &str = "correct-count";
const INCORRECT_KEY: &str = "incorrect-count";

/// Counters for one player. Keys are `{player}:correct-count` and `{player}:incorrect-count`.
#[derive(Clone)]
pub struct ScoreTracker {
  store: Arc<dyn CounterStore>,
  player: String,
}

impl ScoreTracker {
  pub fn new(store: Arc<dyn CounterStore>, player: impl Into<String>) -> Self {
    Self { store, player: player.into() }
  }

  fn key(&self, name: &str) -> String {
    format!("{}:{}", self.player, name)
  }

  /// Add one to the counter matching `code`. Not idempotent: callers gate on reveal state.
  #[instrument(level = "info", skip(self), fields(player = %self.player))]
  pub fn record_guess(&self, code: MembershipCode) -> Result<ScoreCounts, StoreError> {
    let key = match code {
      MembershipCode::Correct => self.key(CORRECT_KEY),
      MembershipCode::Incorrect => self.key(INCORRECT_KEY),
    };
    let value = self.store.increment(&key)?;
    info!(target: "score", player = %self.player, ?code, value, "Guess recorded");
    self.counts()
  }

  pub fn counts(&self) -> Result<ScoreCounts, StoreError> {
    Ok(ScoreCounts {
      correct: self.store.get(&self.key(CORRECT_KEY))?,
      incorrect: self.store.get(&self.key(INCORRECT_KEY))?,
    })
  }
}
