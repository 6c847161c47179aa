//! Live adapter for the `Entropy` port backed by `rand`.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ports::Entropy;

/// Entropy drawn from a `StdRng`, either OS-seeded or seeded explicitly.
pub struct RngEntropy {
    rng: Mutex<StdRng>,
}

impl RngEntropy {
    /// Creates an entropy source seeded from the operating system.
    #[must_use]
    pub fn from_os() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Creates a reproducible entropy source.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl Default for RngEntropy {
    fn default() -> Self {
        Self::from_os()
    }
}

impl Entropy for RngEntropy {
    fn below(&self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).gen_range(0..upper)
    }

    fn chance(&self, p: f64) -> bool {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).gen_bool(p.clamp(0.0, 1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_stays_in_range() {
        let entropy = RngEntropy::from_os();
        for _ in 0..200 {
            assert!(entropy.below(7) < 7);
        }
        assert_eq!(entropy.below(0), 0);
    }

    #[test]
    fn seeded_sources_repeat() {
        let a = RngEntropy::seeded(42);
        let b = RngEntropy::seeded(42);
        let draws_a: Vec<usize> = (0..32).map(|_| a.below(1000)).collect();
        let draws_b: Vec<usize> = (0..32).map(|_| b.below(1000)).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn chance_extremes_are_certain() {
        let entropy = RngEntropy::seeded(1);
        assert!(entropy.chance(1.0));
        assert!(!entropy.chance(0.0));
        assert!(entropy.chance(7.5));
    }
}
