//! Randomness port.
//!
//! Every random decision in the pipeline (synthetic directory names, shuffles,
//! renamed files, cloaking strategies, markers) is drawn through this trait.
//! Swapping the adapter for a seeded one makes a whole run reproducible
//! without touching any pipeline code.

/// Source of uniformly distributed random choices.
pub trait Entropy: Send + Sync {
    /// Returns an index uniformly distributed in `0..upper`.
    ///
    /// Returns `0` when `upper` is `0`.
    fn below(&self, upper: usize) -> usize;

    /// Returns `true` with probability `p` (clamped to `0.0..=1.0`).
    fn chance(&self, p: f64) -> bool;
}
