//! Odd Art Out · game backend
//!
//! Four paintings, three by one artist and one by another; the player picks the odd one out.
//!
//! - Axum HTTP + WebSocket API
//! - Artwork metadata from the Met collection API
//! - Guess counters persisted per player
//! - Static page fallback (STATIC_DIR/index.html)
//!
//! Important env variables:
//!   PORT             : u16 (default 3000)
//!   GAME_CONFIG_PATH : path to TOML config (see `config.rs`)
//!   CATALOG_PATH     : JSON catalog {"Artist": [objectId | objectUrl, ...]}
//!   SCORES_PATH      : JSON file for guess counters (memory only if unset)
//!   MET_BASE_URL     : default "https://collectionapi.metmuseum.org/public/collection/v1"
//!   LOG_LEVEL        : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT       : "pretty" (default) or "json"

mod telemetry;
mod error;
mod domain;
mod sampling;
mod round;
mod catalog;
mod seeds;
mod store;
mod score;
mod session;
mod met;
mod config;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::GameConfig;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Catalog, score store and museum client.
  let cfg = GameConfig::from_env();
  let state = Arc::new(AppState::from_config(&cfg)?);
  let sweeper = state.spawn_idle_sweeper();

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "odd_art_out", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  sweeper.abort();
  info!(target: "odd_art_out", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "odd_art_out", error = %e, "Failed to listen for Ctrl-C");
    std::future::pending::<()>().await;
  }
  info!(target: "odd_art_out", "Shutdown requested");
}
