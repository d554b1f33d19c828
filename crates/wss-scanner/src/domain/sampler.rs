//! Seed sampling for the next round of DHT queries.
//!
//! The pool is the connected peers followed by every known-invalid and
//! known-valid peer. Classified peers stay eligible as seeds.

use super::state::ScanState;
use super::types::PeerIdentifier;
use crate::ports::RandomSource;

/// Draw up to `size` seeds, with replacement, from the combined pool.
///
/// Each draw picks an index uniformly in `0..=pool.len()`. The one-past-end
/// index yields nothing and is skipped, so the result may be shorter than
/// `size` and is always empty for an empty pool.
pub fn sample<R: RandomSource + ?Sized>(
    connected: &[PeerIdentifier],
    state: &ScanState,
    size: usize,
    rng: &R,
) -> Vec<PeerIdentifier> {
    let pool: Vec<&PeerIdentifier> = connected
        .iter()
        .chain(state.known_invalid().iter())
        .chain(state.known_valid().iter())
        .collect();

    (0..size)
        .filter_map(|_| pool.get(rng.random_usize(pool.len() + 1)))
        .map(|peer| (*peer).clone())
        .collect()
}
