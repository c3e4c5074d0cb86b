//! Catalog loading from JSON (`{"Artist": [id | object-url, ...]}`) plus attribution filtering.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::domain::{ArtworkId, Catalog, INCORRECT_PICKS};
use crate::error::ConfigError;

/// A catalog entry: bare object id or a full `.../objects/{id}` URL.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Entry {
  Id(ArtworkId),
  Url(String),
}

impl Entry {
  fn into_id(self) -> Option<ArtworkId> {
    match self {
      Entry::Id(id) => Some(id),
      Entry::Url(url) => url.trim_end_matches('/').rsplit('/').next()?.parse().ok(),
    }
  }
}

#[instrument(level = "info")]
pub fn load_catalog(path: &str) -> Result<Catalog, ConfigError> {
  let raw = std::fs::read_to_string(path)
    .map_err(|source| ConfigError::Read { path: path.to_string(), source })?;
  parse_catalog(&raw).map_err(|message| ConfigError::Catalog { path: path.to_string(), message })
}

pub fn parse_catalog(raw: &str) -> Result<Catalog, String> {
  let entries: BTreeMap<String, Vec<Entry>> = serde_json::from_str(raw).map_err(|e| e.to_string())?;

  // An object id belongs to exactly one artist; later keys lose it.
  let mut owners: HashMap<ArtworkId, String> = HashMap::new();
  let mut artists = BTreeMap::new();
  for (artist, list) in entries {
    if !is_single_identified_artist(&artist) {
      warn!(target: "odd_art_out", %artist, "Skipping ambiguous attribution");
      continue;
    }
    let mut ids = Vec::with_capacity(list.len());
    for entry in list {
      let Some(id) = entry.into_id() else {
        warn!(target: "odd_art_out", %artist, "Skipping entry without an object id");
        continue;
      };
      match owners.get(&id) {
        None => {
          owners.insert(id, artist.clone());
          ids.push(id);
        }
        Some(owner) if *owner == artist => {}
        Some(owner) => warn!(target: "odd_art_out", %id, %artist, %owner, "Skipping object listed under two artists"),
      }
    }
    if ids.is_empty() {
      warn!(target: "odd_art_out", %artist, "Skipping artist with no artworks");
      continue;
    }
    artists.insert(artist, ids);
  }
  Ok(Catalog::new(artists))
}

/// Rejects joint attributions ("A|B"), unknown hands and workshop labels like "French Painter".
fn is_single_identified_artist(name: &str) -> bool {
  let lower = name.to_lowercase();
  !name.trim().is_empty() && !name.contains('|') && !lower.contains("unidentified") && !lower.contains("painter")
}

/// Log what the game can draw from.
pub fn log_inventory(catalog: &Catalog) {
  let full = catalog
    .artist_names()
    .into_iter()
    .filter(|a| catalog.artworks(a).len() >= INCORRECT_PICKS)
    .count();
  info!(
    target: "odd_art_out",
    artists = catalog.artist_count(),
    artworks = catalog.artwork_count(),
    artists_with_three = full,
    "Catalog inventory"
  );
}
