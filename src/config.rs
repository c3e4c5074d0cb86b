//! Game configuration: optional TOML file plus environment overrides.
//!
//! TOML schema (all keys optional):
//!   catalog_path = "painting_ids.json"
//!   scores_path = "scores.json"
//!   met_base_url = "https://collectionapi.metmuseum.org/public/collection/v1"
//!   request_timeout_secs = 20
//!   static_dir = "./static"
//!   session_idle_secs = 1800
//!   max_sessions = 10000

use serde::Deserialize;
use tracing::{error, info};

use crate::met::DEFAULT_BASE_URL;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameConfig {
  /// JSON catalog; the built-in seed catalog is used when unset.
  pub catalog_path: Option<String>,
  /// JSON score file; scores stay in memory when unset.
  pub scores_path: Option<String>,
  pub met_base_url: String,
  pub request_timeout_secs: u64,
  pub static_dir: String,
  /// HTTP sessions untouched for this long are dropped.
  pub session_idle_secs: u64,
  /// Upper bound on HTTP sessions; the least recently used one makes room.
  pub max_sessions: usize,
}

impl Default for GameConfig {
  fn default() -> Self {
    Self {
      catalog_path: None,
      scores_path: None,
      met_base_url: DEFAULT_BASE_URL.into(),
      request_timeout_secs: 20,
      static_dir: "./static".into(),
      session_idle_secs: 30 * 60,
      max_sessions: 10_000,
    }
  }
}

impl GameConfig {
  /// GAME_CONFIG_PATH (if any), then CATALOG_PATH / SCORES_PATH / MET_BASE_URL on top.
  pub fn from_env() -> Self {
    let mut cfg = load_game_config_from_env().unwrap_or_default();
    cfg.apply_overrides(|k| std::env::var(k).ok());
    cfg
  }

  fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
    if let Some(p) = var("CATALOG_PATH") { self.catalog_path = Some(p); }
    if let Some(p) = var("SCORES_PATH") { self.scores_path = Some(p); }
    if let Some(u) = var("MET_BASE_URL") { self.met_base_url = u; }
  }
}

/// Attempt to load `GameConfig` from GAME_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_game_config_from_env() -> Option<GameConfig> {
  let path = std::env::var("GAME_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<GameConfig>(&s) {
      Ok(cfg) => {
        info!(target: "odd_art_out", %path, "Loaded game config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "odd_art_out", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "odd_art_out", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
