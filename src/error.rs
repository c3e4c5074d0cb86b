//! Error types for round generation, the museum API, score storage and the HTTP surface.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};

use crate::domain::ArtworkId;

/// Catalog preconditions that make a round impossible.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoundError {
  #[error("catalog needs at least 2 artists, found {found}")]
  NotEnoughArtists { found: usize },

  /// No artist has enough artworks to play the "three of a kind" role.
  #[error("no artist pair can fill a round (need one artist with {needed} artworks and another with at least 1)")]
  NoFeasiblePair { needed: usize },

  #[error("cannot sample {requested} items from {available}")]
  SampleTooLarge { requested: usize, available: usize },
}

/// Museum API failures, scoped to a single artwork.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
  #[error("network error fetching object {id}: {message}")]
  Network { id: ArtworkId, message: String },

  #[error("museum API returned HTTP {status} for object {id}")]
  Status { id: ArtworkId, status: u16 },

  #[error("malformed response for object {id}: {message}")]
  Malformed { id: ArtworkId, message: String },
}

/// Durable counter store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("score store I/O error at {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("score store is corrupt: {0}")]
  Corrupt(#[from] serde_json::Error),

  #[error("score store lock poisoned")]
  Poisoned,

  /// The blocking write task panicked or was cancelled.
  #[error("score store task failed: {0}")]
  Task(String),
}

/// Startup configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("cannot read {path}: {source}")]
  Read {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("cannot parse catalog {path}: {message}")]
  Catalog { path: String, message: String },

  #[error("cannot build HTTP client: {0}")]
  Client(String),

  #[error(transparent)]
  Store(#[from] StoreError),
}

/// Errors returned by HTTP handlers as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("unknown session: {0}")]
  UnknownSession(String),

  #[error("session {session} belongs to player {expected}, not {given}")]
  PlayerMismatch { session: String, expected: String, given: String },

  #[error("no round in progress")]
  NoRound,

  #[error("artwork index {0} out of range")]
  BadIndex(usize),

  #[error(transparent)]
  Round(#[from] RoundError),

  #[error(transparent)]
  Store(#[from] StoreError),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
      ApiError::PlayerMismatch { .. } => StatusCode::CONFLICT,
      ApiError::NoRound | ApiError::BadIndex(_) => StatusCode::BAD_REQUEST,
      ApiError::Round(_) | ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = serde_json::json!({ "error": self.to_string() });
    (self.status(), Json(body)).into_response()
  }
}
