//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Starting rounds and dispatching the four metadata fetches
//!   - Applying fetch results to their indexed slots (stale rounds discarded)
//!   - Activations and score lookups

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, instrument};

use crate::domain::ArtworkId;
use crate::error::ApiError;
use crate::protocol::{artwork_out, outcome_out, round_out, ActivateOut, ArtworkOut, RoundOut, ScoresOut};
use crate::session::Resolution;
use crate::state::{AppState, RoundTicket};

/// Result of one slot's fetch after it was applied.
#[derive(Debug)]
pub struct SlotUpdate {
  pub generation: u64,
  pub artwork: ArtworkOut,
}

/// Fetch one artwork and write it into its slot. `None` when the round moved on.
#[instrument(level = "debug", skip(state), fields(session = %session_id))]
pub async fn resolve_slot(
  state: Arc<AppState>,
  session_id: String,
  generation: u64,
  index: usize,
  id: ArtworkId,
) -> Option<SlotUpdate> {
  let result = state.met.fetch_artwork(id).await;
  if let Err(e) = &result {
    error!(target: "met", %id, index, error = %e, "Artwork fetch failed");
  }
  match state.apply_fetch(&session_id, generation, index, result).await {
    Resolution::Applied => state
      .with_session(&session_id, |s| artwork_out(s, index))
      .await
      .ok()
      .map(|artwork| SlotUpdate { generation, artwork }),
    Resolution::Stale => {
      debug!(target: "round", session = %session_id, generation, index, "Stale fetch ignored");
      None
    }
  }
}

/// Spawn the four fetches of `ticket` into `tasks`, one per slot.
pub fn dispatch_fetches(state: &Arc<AppState>, ticket: &RoundTicket, tasks: &mut JoinSet<Option<SlotUpdate>>) {
  for (index, id) in ticket.artwork_ids.iter().copied().enumerate() {
    tasks.spawn(resolve_slot(state.clone(), ticket.session_id.clone(), ticket.generation, index, id));
  }
}

/// Start a round and resolve its artworks in the background.
#[instrument(level = "info", skip(state))]
pub async fn new_round_detached(
  state: &Arc<AppState>,
  session_id: Option<String>,
  player_id: Option<String>,
) -> Result<RoundOut, ApiError> {
  let ticket = state.start_round(session_id, player_id).await?;
  for (index, id) in ticket.artwork_ids.iter().copied().enumerate() {
    tokio::spawn(resolve_slot(state.clone(), ticket.session_id.clone(), ticket.generation, index, id));
  }
  state.with_session(&ticket.session_id, round_out).await
}

pub async fn current_round(state: &AppState, session_id: &str) -> Result<RoundOut, ApiError> {
  state.with_session(session_id, round_out).await
}

#[instrument(level = "info", skip(state))]
pub async fn activate(state: &AppState, session_id: &str, index: usize) -> Result<ActivateOut, ApiError> {
  let (activation, player) = state.activate(session_id, index).await?;
  let (outcome, code) = outcome_out(&activation);
  let round = state.with_session(session_id, round_out).await?;
  let scores = state.counts(&player).await?.into();
  Ok(ActivateOut { outcome, code, round, scores })
}

pub async fn scores(state: &AppState, player_id: &str) -> Result<ScoresOut, ApiError> {
  Ok(state.counts(player_id).await?.into())
}
