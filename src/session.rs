//! Per-session game state: current round, indexed artwork slots and the reveal state machine.
//!
//! Events:
//!   - round generated   -> generation += 1, all slots pending, `Hidden`
//!   - fetch resolved    -> slot `index` filled if the generation still matches
//!   - artwork activated -> first one flips to `Revealed` and yields the guess to record
//!
//! Recording the guess is left to the caller so the store write happens outside the
//! sessions lock.

use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};

use crate::domain::{ArtworkMetadata, MembershipCode, RevealState, Round, ROUND_SIZE};
use crate::error::{ApiError, FetchError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
  Pending,
  Resolved { artwork: ArtworkMetadata, code: MembershipCode },
  Failed { message: String },
}

impl SlotState {
  pub fn code(&self) -> Option<MembershipCode> {
    match self {
      SlotState::Resolved { code, .. } => Some(*code),
      _ => None,
    }
  }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Resolution {
  Applied,
  /// Response belongs to a round that has since been replaced.
  Stale,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Activation {
  /// First activation of the round; the guess with this code must be recorded.
  Scored(MembershipCode),
  /// First activation, but the slot had no metadata yet. Revealed without scoring.
  Unscored,
  /// Round was already revealed; nothing happened.
  AlreadyRevealed,
}

#[derive(Debug)]
pub struct GameSession {
  pub id: String,
  pub player: String,
  generation: u64,
  round: Option<Round>,
  slots: [SlotState; ROUND_SIZE],
  reveal: RevealState,
  last_seen: Instant,
  /// Owned by an open socket; removed on disconnect, never by idle eviction.
  live: bool,
}

impl GameSession {
  pub fn new(id: impl Into<String>, player: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      player: player.into(),
      generation: 0,
      round: None,
      slots: std::array::from_fn(|_| SlotState::Pending),
      reveal: RevealState::Hidden,
      last_seen: Instant::now(),
      live: false,
    }
  }

  /// Session bound to a WebSocket connection.
  pub fn for_socket(id: impl Into<String>, player: impl Into<String>) -> Self {
    Self { live: true, ..Self::new(id, player) }
  }

  pub fn generation(&self) -> u64 { self.generation }
  pub fn round(&self) -> Option<&Round> { self.round.as_ref() }
  pub fn slots(&self) -> &[SlotState; ROUND_SIZE] { &self.slots }
  pub fn reveal(&self) -> RevealState { self.reveal }
  pub fn is_live(&self) -> bool { self.live }
  pub fn last_seen(&self) -> Instant { self.last_seen }

  pub fn idle_for(&self, now: Instant) -> Duration {
    now.saturating_duration_since(self.last_seen)
  }

  /// Replace the round wholesale. Returns the new generation to tag fetches with.
  #[instrument(level = "debug", skip(self, round), fields(session = %self.id))]
  pub fn start_round(&mut self, round: Round) -> u64 {
    self.generation += 1;
    debug!(
      target: "round",
      generation = self.generation,
      correct = %round.correct_artist,
      incorrect = %round.incorrect_artist,
      "Round installed"
    );
    self.round = Some(round);
    self.slots = std::array::from_fn(|_| SlotState::Pending);
    self.reveal = RevealState::Hidden;
    self.last_seen = Instant::now();
    self.generation
  }

  /// Store a fetch result in slot `index`, unless it belongs to an older round.
  pub fn apply_fetch(
    &mut self,
    generation: u64,
    index: usize,
    result: Result<ArtworkMetadata, FetchError>,
  ) -> Resolution {
    let Some(round) = self.round.as_ref() else { return Resolution::Stale };
    if generation != self.generation || index >= ROUND_SIZE {
      debug!(target: "round", session = %self.id, generation, current = self.generation, index, "Discarding stale fetch");
      return Resolution::Stale;
    }
    self.slots[index] = match result {
      Ok(artwork) => {
        let code = MembershipCode::classify(&artwork.artist_display_name, &round.correct_artist);
        SlotState::Resolved { artwork, code }
      }
      Err(e) => SlotState::Failed { message: e.to_string() },
    };
    Resolution::Applied
  }

  /// Handle a click/activate on slot `index`.
  ///
  /// Only the first activation per round yields `Scored`; the reveal has already flipped
  /// by the time the caller records it.
  #[instrument(level = "info", skip(self), fields(session = %self.id, generation = self.generation))]
  pub fn activate(&mut self, index: usize) -> Result<Activation, ApiError> {
    if self.round.is_none() {
      return Err(ApiError::NoRound);
    }
    if index >= ROUND_SIZE {
      return Err(ApiError::BadIndex(index));
    }
    self.last_seen = Instant::now();
    if self.reveal == RevealState::Revealed {
      return Ok(Activation::AlreadyRevealed);
    }

    let code = self.slots[index].code();
    self.reveal = RevealState::Revealed;

    info!(target: "round", session = %self.id, index, ?code, "Round revealed");
    Ok(match code {
      Some(c) => Activation::Scored(c),
      None => Activation::Unscored,
    })
  }
}
