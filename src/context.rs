//! Service context bundling all port trait objects.

use std::sync::Arc;

use crate::adapters::live::{
    CompactStyleMinifier, GlobalRenamingObfuscator, LiveFileSystem, RngEntropy, SystemClock,
};
use crate::ports::clock::Clock;
use crate::ports::entropy::Entropy;
use crate::ports::filesystem::FileSystem;
use crate::ports::script::ScriptObfuscator;
use crate::ports::style::StyleMinifier;

/// Bundles all port trait objects into a single context.
///
/// Each output copy gets its own context, so randomness is never shared
/// between copies.
pub struct ServiceContext {
    /// Clock for marker and snapshot timestamps.
    pub clock: Box<dyn Clock>,
    /// Filesystem for every read, write and move.
    pub fs: Box<dyn FileSystem>,
    /// Randomness for layouts, names and cloaking.
    pub entropy: Box<dyn Entropy>,
    /// Script obfuscator collaborator.
    pub scripts: Box<dyn ScriptObfuscator>,
    /// Style minifier collaborator; shared with blocking tasks.
    pub styles: Arc<dyn StyleMinifier>,
}

impl ServiceContext {
    /// Creates a live context with OS-seeded randomness.
    #[must_use]
    pub fn live() -> Self {
        Self::with_entropy(Box::new(RngEntropy::from_os()))
    }

    /// Creates a live context whose randomness is reproducible from `seed`.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::with_entropy(Box::new(RngEntropy::seeded(seed)))
    }

    fn with_entropy(entropy: Box<dyn Entropy>) -> Self {
        Self {
            clock: Box::new(SystemClock),
            fs: Box::new(LiveFileSystem),
            entropy,
            scripts: Box::new(GlobalRenamingObfuscator),
            styles: Arc::new(CompactStyleMinifier),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_contexts_draw_the_same_sequence() {
        let a = ServiceContext::seeded(99);
        let b = ServiceContext::seeded(99);
        let draws_a: Vec<usize> = (0..16).map(|_| a.entropy.below(500)).collect();
        let draws_b: Vec<usize> = (0..16).map(|_| b.entropy.below(500)).collect();
        assert_eq!(draws_a, draws_b);
    }

    #[test]
    fn live_context_wires_collaborators() {
        let ctx = ServiceContext::live();
        assert_eq!(ctx.styles.minify("a { b: c; }").unwrap(), "a{b:c}");
    }
}
