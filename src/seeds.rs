//! Built-in catalog so the game is playable without a catalog file.
//!
//! Artist keys match the museum's `artistDisplayName` exactly; otherwise every
//! artwork would be classified as incorrect.

use std::collections::BTreeMap;

use crate::domain::Catalog;

pub fn seed_catalog() -> Catalog {
  let artists = BTreeMap::from([
    ("Vincent van Gogh".to_string(), vec![436532, 436535, 436524, 436528, 436529, 437998]),
    ("Claude Monet".to_string(), vec![437112, 437127, 437133, 438008, 437126, 437135]),
    ("Edgar Degas".to_string(), vec![436155, 436140, 436162, 438417, 436121]),
    ("Paul Cézanne".to_string(), vec![435868, 435882, 437959, 435875]),
    ("Rembrandt (Rembrandt van Rijn)".to_string(), vec![437397, 437394, 437396, 437392]),
    ("Johannes Vermeer".to_string(), vec![437881, 437878, 437880, 437879]),
  ]);
  Catalog::new(artists)
}
