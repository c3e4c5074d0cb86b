//! Tracing setup for the game server.
//!
//! `LOG_LEVEL` takes `EnvFilter` directives (default: [`DEFAULT_FILTER`]). `LOG_FORMAT=json`
//! switches to one JSON object per event; anything else prints human-readable lines.
//!
//! Targets: `odd_art_out` (startup, sockets), `round` (sessions and rounds), `met`
//! (museum API), `score` (guess counters).

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,round=debug,score=info,met=info,odd_art_out=debug,tower_http=info,axum=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
  Pretty,
  Json,
}

impl LogFormat {
  fn parse(raw: Option<&str>) -> Self {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
      Some("json") => LogFormat::Json,
      _ => LogFormat::Pretty,
    }
  }
}

/// Directives from `LOG_LEVEL`, falling back to the defaults when unset or invalid.
fn filter_from(raw: Option<&str>) -> EnvFilter {
  raw
    .filter(|s| !s.trim().is_empty())
    .and_then(|s| EnvFilter::try_new(s).ok())
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init_tracing() {
  let level = std::env::var("LOG_LEVEL").ok();
  let format = std::env::var("LOG_FORMAT").ok();

  let fmt = tracing_subscriber::fmt()
    .with_env_filter(filter_from(level.as_deref()))
    .with_target(true)
    .with_file(true)
    .with_line_number(true);

  // `json()` changes the builder type, so each arm finishes its own subscriber.
  match LogFormat::parse(format.as_deref()) {
    LogFormat::Json => fmt.json().init(),
    LogFormat::Pretty => fmt.init(),
  }
}
