//! Opt-in symbol renaming that feeds the ledger's `ids` and `globals` maps.
//!
//! Both passes only decide names and rewrite what they own; script lookups
//! of DOM ids are fixed later by the reference rewriter, and globals are
//! applied by the script obfuscator during the per-file passes.

pub mod globals;
pub mod ids;

use std::collections::HashSet;

use crate::naming;
use crate::ports::Entropy;

pub use globals::{collect_globals, discover_globals, should_rename_global, GlobalsReport};
pub use ids::{rename_ids, IdsReport};

/// Draws identifiers until one is not in `taken`, then marks it taken.
fn fresh_identifier(entropy: &dyn Entropy, taken: &mut HashSet<String>) -> String {
    loop {
        let candidate = naming::identifier(entropy);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
    }
}

/// Regex alternation of literal names, longest first.
fn alternation<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    let mut names: Vec<&str> = names.into_iter().map(String::as_str).collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    names.iter().map(|n| regex::escape(n)).collect::<Vec<_>>().join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::RngEntropy;

    #[test]
    fn fresh_identifiers_are_unique() {
        let entropy = RngEntropy::seeded(1);
        let mut taken = HashSet::new();
        for _ in 0..300 {
            fresh_identifier(&entropy, &mut taken);
        }
        assert_eq!(taken.len(), 300);
    }

    #[test]
    fn alternation_is_escaped_and_longest_first() {
        let names = ["a.b".to_string(), "abcd".to_string(), "xy".to_string()];
        assert_eq!(alternation(&names), r"abcd|a\.b|xy");
    }
}
