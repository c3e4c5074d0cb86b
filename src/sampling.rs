//! Fisher–Yates based random selection.
//!
//! Both helpers take the RNG as a parameter so rounds are reproducible under a seeded `StdRng`.

use rand::Rng;

use crate::error::RoundError;

/// Pick `n` distinct elements uniformly at random, in pick order.
///
/// Partial Fisher–Yates: each step draws from the not-yet-picked prefix and swaps the pick
/// to the end of that prefix. Every ordered n-permutation is equally likely.
pub fn pick_random_items<T: Clone, R: Rng + ?Sized>(
  items: &[T],
  n: usize,
  rng: &mut R,
) -> Result<Vec<T>, RoundError> {
  if n > items.len() {
    return Err(RoundError::SampleTooLarge { requested: n, available: items.len() });
  }
  let mut pool = items.to_vec();
  let mut picked = Vec::with_capacity(n);
  let mut remaining = pool.len();
  while picked.len() < n {
    let i = rng.gen_range(0..remaining);
    remaining -= 1;
    pool.swap(i, remaining);
    picked.push(pool[remaining].clone());
  }
  Ok(picked)
}

/// Full in-place Fisher–Yates shuffle.
pub fn shuffle_in_place<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
  for i in (1..items.len()).rev() {
    let j = rng.gen_range(0..=i);
    items.swap(i, j);
  }
}
