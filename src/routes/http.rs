//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs its parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

/// Start a round. A known `sessionId` sent with a different `playerId` gets 409.
#[instrument(level = "info", skip(state, body))]
pub async fn http_post_round(
  State(state): State<Arc<AppState>>,
  body: Option<Json<NewRoundIn>>,
) -> Result<Json<RoundOut>, ApiError> {
  let Json(body) = body.unwrap_or_default();
  let round = logic::new_round_detached(&state, body.session_id, body.player_id).await?;
  info!(target: "round", session = %round.session_id, generation = round.generation, "HTTP round started");
  Ok(Json(round))
}

#[instrument(level = "info", skip(state), fields(session = %q.session_id))]
pub async fn http_get_round(
  State(state): State<Arc<AppState>>,
  Query(q): Query<RoundQuery>,
) -> Result<Json<RoundOut>, ApiError> {
  Ok(Json(logic::current_round(&state, &q.session_id).await?))
}

#[instrument(level = "info", skip(state, body), fields(session = %body.session_id, index = body.index))]
pub async fn http_post_activate(
  State(state): State<Arc<AppState>>,
  Json(body): Json<ActivateIn>,
) -> Result<Json<ActivateOut>, ApiError> {
  let out = logic::activate(&state, &body.session_id, body.index).await?;
  info!(target: "round", session = %body.session_id, outcome = ?out.outcome, "HTTP activation handled");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state), fields(player = %q.player_id))]
pub async fn http_get_scores(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ScoresQuery>,
) -> Result<Json<ScoresOut>, ApiError> {
  Ok(Json(logic::scores(&state, &q.player_id).await?))
}
