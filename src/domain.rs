//! Domain models: catalog, rounds, resolved artwork metadata, membership codes and scores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Museum object id (Met collection API `objectID`).
pub type ArtworkId = u64;

/// Number of artworks shown in every round.
pub const ROUND_SIZE: usize = 4;
/// Artworks drawn from the odd-one-out artist.
pub const CORRECT_PICKS: usize = 1;
/// Artworks drawn from the other artist.
pub const INCORRECT_PICKS: usize = ROUND_SIZE - CORRECT_PICKS;

/// Artist name -> artwork ids. Immutable after startup.
///
/// A `BTreeMap` keeps artist order stable, so seeded rounds are reproducible.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
  artists: BTreeMap<String, Vec<ArtworkId>>,
}

impl Catalog {
  pub fn new(artists: BTreeMap<String, Vec<ArtworkId>>) -> Self {
    Self { artists }
  }

  pub fn artist_names(&self) -> Vec<&str> {
    self.artists.keys().map(String::as_str).collect()
  }

  pub fn artworks(&self, artist: &str) -> &[ArtworkId] {
    self.artists.get(artist).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn artist_count(&self) -> usize {
    self.artists.len()
  }

  pub fn artwork_count(&self) -> usize {
    self.artists.values().map(Vec::len).sum()
  }

  /// Catalog artist owning `id`, if any.
  #[cfg(test)]
  pub fn artist_of(&self, id: ArtworkId) -> Option<&str> {
    self.artists
      .iter()
      .find(|(_, ids)| ids.contains(&id))
      .map(|(name, _)| name.as_str())
  }
}

/// One generated round. Replaced as a whole, never edited.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
  pub correct_artist: String,
  pub incorrect_artist: String,
  /// Presentation order.
  pub artwork_ids: [ArtworkId; ROUND_SIZE],
}

/// Whether an artwork was painted by the round's odd-one-out artist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipCode {
  Correct,
  Incorrect,
}

impl MembershipCode {
  /// Compares the API's display name with the catalog key, byte for byte.
  pub fn classify(artist_display_name: &str, correct_artist: &str) -> Self {
    if artist_display_name == correct_artist {
      MembershipCode::Correct
    } else {
      MembershipCode::Incorrect
    }
  }
}

/// Display data for one artwork, resolved from the museum API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkMetadata {
  pub id: ArtworkId,
  pub image_url: String,
  pub alt_text: String,
  pub artist_display_name: String,
  pub title: String,
  pub year: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealState {
  #[default]
  Hidden,
  Revealed,
}

/// Cumulative guess totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScoreCounts {
  pub correct: u64,
  pub incorrect: u64,
}

impl ScoreCounts {
  pub fn correct_label(&self) -> &'static str {
    if self.correct > 1 { "Correct Guesses" } else { "Correct Guess" }
  }

  pub fn incorrect_label(&self) -> &'static str {
    if self.incorrect > 1 { "Incorrect Guesses" } else { "Incorrect Guess" }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classify_is_exact_match() {
    assert_eq!(MembershipCode::classify("Claude Monet", "Claude Monet"), MembershipCode::Correct);
    assert_eq!(MembershipCode::classify("claude monet", "Claude Monet"), MembershipCode::Incorrect);
    assert_eq!(MembershipCode::classify("Edgar Degas", "Claude Monet"), MembershipCode::Incorrect);
  }

  #[test]
  fn labels_pluralize_above_one() {
    let zero = ScoreCounts::default();
    assert_eq!(zero.correct_label(), "Correct Guess");
    assert_eq!(zero.incorrect_label(), "Incorrect Guess");

    let many = ScoreCounts { correct: 2, incorrect: 1 };
    assert_eq!(many.correct_label(), "Correct Guesses");
    assert_eq!(many.incorrect_label(), "Incorrect Guess");
  }

  #[test]
  fn artist_of_finds_owner() {
    let mut m = BTreeMap::new();
    m.insert("A".to_string(), vec![1]);
    m.insert("B".to_string(), vec![2, 3]);
    let c = Catalog::new(m);
    assert_eq!(c.artist_of(3), Some("B"));
    assert_eq!(c.artist_of(9), None);
    assert_eq!(c.artwork_count(), 3);
  }
}
