//! Round generation: choose the odd-one-out artist, draw 1 + 3 artworks, shuffle.

use rand::Rng;
use tracing::{debug, instrument};

use crate::domain::{ArtworkId, Catalog, Round, CORRECT_PICKS, INCORRECT_PICKS, ROUND_SIZE};
use crate::error::RoundError;
use crate::sampling::{pick_random_items, shuffle_in_place};

/// Build a fresh round from `catalog`.
///
/// The artist pair is drawn as an ordered 2-sample; pairs whose artists cannot supply
/// 1 and 3 artworks are redrawn, which keeps the draw uniform over feasible pairs.
#[instrument(level = "debug", skip_all, fields(artists = catalog.artist_count()))]
pub fn generate_round<R: Rng + ?Sized>(catalog: &Catalog, rng: &mut R) -> Result<Round, RoundError> {
  let artists = catalog.artist_names();
  if artists.len() < 2 {
    return Err(RoundError::NotEnoughArtists { found: artists.len() });
  }
  if !has_feasible_pair(catalog, &artists) {
    return Err(RoundError::NoFeasiblePair { needed: INCORRECT_PICKS });
  }

  let (correct_artist, incorrect_artist) = loop {
    let pair = pick_random_items(&artists, 2, rng)?;
    if is_feasible(catalog, pair[0], pair[1]) {
      break (pair[0], pair[1]);
    }
  };

  let correct = pick_random_items(catalog.artworks(correct_artist), CORRECT_PICKS, rng)?;
  let incorrect = pick_random_items(catalog.artworks(incorrect_artist), INCORRECT_PICKS, rng)?;

  let mut ids: [ArtworkId; ROUND_SIZE] = [0; ROUND_SIZE];
  for (slot, id) in ids.iter_mut().zip(correct.into_iter().chain(incorrect)) {
    *slot = id;
  }
  shuffle_in_place(&mut ids, rng);

  debug!(target: "round", %correct_artist, %incorrect_artist, ?ids, "Round generated");
  Ok(Round {
    correct_artist: correct_artist.to_string(),
    incorrect_artist: incorrect_artist.to_string(),
    artwork_ids: ids,
  })
}

fn is_feasible(catalog: &Catalog, correct: &str, incorrect: &str) -> bool {
  catalog.artworks(correct).len() >= CORRECT_PICKS
    && catalog.artworks(incorrect).len() >= INCORRECT_PICKS
}

fn has_feasible_pair(catalog: &Catalog, artists: &[&str]) -> bool {
  artists.iter().any(|incorrect| {
    catalog.artworks(incorrect).len() >= INCORRECT_PICKS
      && artists
        .iter()
        .any(|correct| correct != incorrect && catalog.artworks(correct).len() >= CORRECT_PICKS)
  })
}
