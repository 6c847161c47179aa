//! Random names, identifiers and markers drawn through the [`Entropy`] port.

use crate::ports::Entropy;

/// Prefixes for synthetic directory segments.
pub const DIRECTORY_PREFIXES: &[&str] =
    &["app", "src", "lib", "mod", "core", "util", "com", "data", "res", "assets"];

/// Prefixes for renamed files.
pub const FILE_PREFIXES: &[&str] = &["file", "mod", "comp", "item", "data", "core", "res", "asset"];

const MARKER_PREFIXES: &[&str] = &[
    "PROCESSED",
    "COMPILED",
    "OPTIMIZED",
    "ENHANCED",
    "TRANSFORMED",
    "MINIFIED",
    "BUNDLED",
    "COMPRESSED",
    "ENCODED",
    "SECURED",
    "GENERATED",
    "BUILT",
    "PACKED",
    "MODIFIED",
    "CONVERTED",
    "PREPARED",
    "RENDERED",
    "FORMATTED",
    "PROTECTED",
    "UPDATED",
];

const MARKER_SUFFIXES: &[&str] = &[
    "CODE",
    "SCRIPT",
    "DATA",
    "CONTENT",
    "FILE",
    "RESOURCE",
    "ASSET",
    "MODULE",
    "COMPONENT",
    "ELEMENT",
    "BLOCK",
    "SECTION",
    "PART",
    "SEGMENT",
    "PIECE",
    "FRAGMENT",
    "CHUNK",
    "UNIT",
];

const HEX: &[u8] = b"0123456789abcdef";
const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Picks one element uniformly. `items` must be non-empty.
pub fn pick<'a, T>(entropy: &dyn Entropy, items: &'a [T]) -> &'a T {
    &items[entropy.below(items.len())]
}

/// Uniform integer in `low..=high`.
pub fn between(entropy: &dyn Entropy, low: usize, high: usize) -> usize {
    if high <= low {
        return low;
    }
    low + entropy.below(high - low + 1)
}

/// Fisher-Yates shuffle in place.
pub fn shuffle<T>(entropy: &dyn Entropy, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = entropy.below(i + 1);
        items.swap(i, j);
    }
}

/// Lower-case hexadecimal string of `len` characters.
pub fn hex(entropy: &dyn Entropy, len: usize) -> String {
    (0..len).map(|_| char::from(*pick(entropy, HEX))).collect()
}

/// Synthetic directory segment: `<prefix>_<6 hex>`.
pub fn directory_segment(entropy: &dyn Entropy) -> String {
    format!("{}_{}", pick(entropy, DIRECTORY_PREFIXES), hex(entropy, 6))
}

/// Synthetic directory path of `depth` segments joined with `/`.
pub fn directory_path(entropy: &dyn Entropy, depth: usize) -> String {
    (0..depth).map(|_| directory_segment(entropy)).collect::<Vec<_>>().join("/")
}

/// Renamed file name: `<prefix>_<8 hex><extension>`; `extension` includes the dot.
pub fn file_name(entropy: &dyn Entropy, extension: &str) -> String {
    format!("{}_{}{extension}", pick(entropy, FILE_PREFIXES), hex(entropy, 8))
}

/// Identifier of 4 to 8 characters that starts with a letter.
pub fn identifier(entropy: &dyn Entropy) -> String {
    let len = between(entropy, 4, 8);
    let mut out = String::with_capacity(len);
    out.push(char::from(*pick(entropy, LETTERS)));
    for _ in 1..len {
        let pool = if entropy.below(LETTERS.len() + DIGITS.len()) < LETTERS.len() {
            LETTERS
        } else {
            DIGITS
        };
        out.push(char::from(*pick(entropy, pool)));
    }
    out
}

/// Marker body `<PREFIX>_<SUFFIX>_<4 digits>_<base36 millis>`.
pub fn marker(entropy: &dyn Entropy, epoch_millis: u64) -> String {
    format!(
        "{}_{}_{}_{}",
        pick(entropy, MARKER_PREFIXES),
        pick(entropy, MARKER_SUFFIXES),
        between(entropy, 1000, 9999),
        base36(epoch_millis)
    )
}

/// Formats `value` in lower-case base 36.
pub fn base36(mut value: u64) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        // Remainder is below 36, so the cast cannot truncate.
        #[allow(clippy::cast_possible_truncation)]
        digits.push(ALPHABET[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::RngEntropy;

    #[test]
    fn directory_segment_shape() {
        let entropy = RngEntropy::seeded(7);
        for _ in 0..50 {
            let segment = directory_segment(&entropy);
            let (prefix, suffix) = segment.split_once('_').unwrap();
            assert!(DIRECTORY_PREFIXES.contains(&prefix));
            assert_eq!(suffix.len(), 6);
            assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn directory_path_has_requested_depth() {
        let entropy = RngEntropy::seeded(3);
        assert_eq!(directory_path(&entropy, 3).split('/').count(), 3);
        assert_eq!(directory_path(&entropy, 1).split('/').count(), 1);
    }

    #[test]
    fn file_name_keeps_extension() {
        let entropy = RngEntropy::seeded(11);
        let name = file_name(&entropy, ".png");
        let stem = name.strip_suffix(".png").unwrap();
        let (prefix, suffix) = stem.split_once('_').unwrap();
        assert!(FILE_PREFIXES.contains(&prefix));
        assert_eq!(suffix.len(), 8);
    }

    #[test]
    fn identifier_starts_with_letter() {
        let entropy = RngEntropy::seeded(5);
        for _ in 0..100 {
            let id = identifier(&entropy);
            assert!((4..=8).contains(&id.len()));
            assert!(id.chars().next().unwrap().is_ascii_alphabetic());
            assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let entropy = RngEntropy::seeded(9);
        let mut items: Vec<u32> = (0..20).collect();
        shuffle(&entropy, &mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn marker_shape() {
        let entropy = RngEntropy::seeded(2);
        let marker = marker(&entropy, 1_700_000_000_000);
        let parts: Vec<&str> = marker.split('_').collect();
        assert_eq!(parts.len(), 4);
        assert!(MARKER_PREFIXES.contains(&parts[0]));
        assert!(MARKER_SUFFIXES.contains(&parts[1]));
        assert_eq!(parts[2].len(), 4);
        assert_eq!(parts[3], base36(1_700_000_000_000));
    }

    #[test]
    fn base36_matches_known_values() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(1_295), "zz");
    }
}
