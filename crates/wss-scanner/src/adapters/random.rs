//! Random Source Adapters

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ports::RandomSource;

/// Fixed random source for deterministic testing.
///
/// Always returns the same value (reduced modulo `max`).
///
/// # Example
///
/// ```rust
/// use wss_scanner::adapters::FixedRandomSource;
/// use wss_scanner::ports::RandomSource;
///
/// let rng = FixedRandomSource::new(42);
/// assert_eq!(rng.random_usize(100), 42);
/// assert_eq!(rng.random_usize(100), 42); // Always same value
/// ```
#[derive(Debug, Clone)]
pub struct FixedRandomSource {
    value: usize,
}

impl FixedRandomSource {
    /// Create a fixed random source that always returns the given value.
    pub fn new(value: usize) -> Self {
        Self { value }
    }

    /// Create a random source that returns 0 (first element).
    pub fn first() -> Self {
        Self::new(0)
    }
}

impl RandomSource for FixedRandomSource {
    fn random_usize(&self, max: usize) -> usize {
        if max == 0 {
            0
        } else {
            self.value % max
        }
    }
}

/// Production random source backed by a `StdRng` seeded from OS entropy.
#[derive(Debug)]
pub struct OsRandomSource {
    rng: Mutex<StdRng>,
}

impl OsRandomSource {
    /// Seed a new generator from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible generator for simulations.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for OsRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for OsRandomSource {
    fn random_usize(&self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        self.rng.lock().gen_range(0..max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_source_wraps_modulo_max() {
        let rng = FixedRandomSource::new(7);
        assert_eq!(rng.random_usize(5), 2);
        assert_eq!(rng.random_usize(0), 0);
        assert_eq!(FixedRandomSource::first().random_usize(9), 0);
    }

    #[test]
    fn test_os_source_stays_in_range() {
        let rng = OsRandomSource::new();
        for max in 1..50 {
            assert!(rng.random_usize(max) < max);
        }
        assert_eq!(rng.random_usize(0), 0);
    }

    #[test]
    fn test_seeded_source_is_reproducible() {
        let a = OsRandomSource::seeded(9);
        let b = OsRandomSource::seeded(9);
        let xs: Vec<_> = (0..10).map(|_| a.random_usize(1000)).collect();
        let ys: Vec<_> = (0..10).map(|_| b.random_usize(1000)).collect();
        assert_eq!(xs, ys);
    }
}
