//! The three interchangeable cloaking strategies.
//!
//! Every strategy keeps the rendered text identical: wrapped characters stay
//! visible and the inserted entities are zero-width.

use crate::naming::{between, identifier, pick};
use crate::ports::Entropy;

/// Zero-width entities safe to interleave between visible characters.
pub const INVISIBLE_ENTITIES: &[&str] = &["&#8203;", "&#8204;", "&#8205;", "&#8288;", "&#65279;"];

const DECORATIVE_ATTRIBUTES: &[&str] =
    &["data-key", "data-id", "data-value", "data-item", "data-elem", "class", "id", "style"];

/// How one keyword occurrence is cloaked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Wrap individual characters in inline `<span>`s.
    SpanWrap,
    /// Insert zero-width entities between characters.
    Interleave,
    /// Both of the above.
    Mixed,
}

impl Strategy {
    /// Every strategy, for uniform selection.
    pub const ALL: [Strategy; 3] = [Strategy::SpanWrap, Strategy::Interleave, Strategy::Mixed];

    /// Picks a strategy uniformly.
    pub fn choose(entropy: &dyn Entropy) -> Self {
        *pick(entropy, &Self::ALL)
    }

    /// Cloaks `text`, the matched occurrence exactly as it appears in the document.
    pub fn apply(self, entropy: &dyn Entropy, text: &str) -> String {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return String::new();
        }
        match self {
            Strategy::SpanWrap => span_wrap(entropy, &chars),
            Strategy::Interleave => interleave(entropy, &chars),
            Strategy::Mixed => mixed(entropy, &chars),
        }
    }
}

fn span_wrap(entropy: &dyn Entropy, chars: &[char]) -> String {
    let last = chars.len() - 1;
    let limit = between(entropy, 1, chars.len());
    let mut out = String::new();
    let mut wrapped = false;
    for (i, &c) in chars.iter().enumerate() {
        if (i < limit && entropy.chance(0.7)) || (!wrapped && i == last) {
            out.push_str(&span(entropy, c, 0.6));
            wrapped = true;
        } else {
            out.push(c);
        }
    }
    out
}

fn interleave(entropy: &dyn Entropy, chars: &[char]) -> String {
    if chars.len() == 1 {
        return format!("{}{}", chars[0], invisible(entropy));
    }
    let last = chars.len() - 1;
    let limit = between(entropy, 1, last);
    let mut out = String::new();
    let mut inserted = false;
    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if i < last && ((i < limit && entropy.chance(0.5)) || (!inserted && i + 1 == last)) {
            out.push_str(invisible(entropy));
            inserted = true;
        }
    }
    out
}

fn mixed(entropy: &dyn Entropy, chars: &[char]) -> String {
    let last = chars.len() - 1;
    let span_limit = between(entropy, 1, chars.len().div_ceil(2));
    let gap_limit = between(entropy, 1, chars.len().div_ceil(3));
    let mut pieces: Vec<String> = Vec::with_capacity(chars.len());
    let mut wrapped = false;
    let mut inserted = false;
    for (i, &c) in chars.iter().enumerate() {
        let mut piece = if i < span_limit && entropy.chance(0.4) {
            wrapped = true;
            span(entropy, c, 0.5)
        } else {
            c.to_string()
        };
        if i < last && i < gap_limit && entropy.chance(0.3) {
            piece.push_str(invisible(entropy));
            inserted = true;
        }
        pieces.push(piece);
    }

    if !wrapped && !inserted {
        if chars.len() > 1 && entropy.chance(0.5) {
            let gap = entropy.below(last);
            pieces[gap].push_str(invisible(entropy));
        } else {
            pieces[0] = span(entropy, chars[0], 0.5);
        }
    }
    pieces.concat()
}

fn span(entropy: &dyn Entropy, c: char, attribute_chance: f64) -> String {
    if entropy.chance(attribute_chance) {
        format!("<span {}>{c}</span>", decorative_attribute(entropy))
    } else {
        format!("<span>{c}</span>")
    }
}

fn invisible(entropy: &dyn Entropy) -> &'static str {
    *pick(entropy, INVISIBLE_ENTITIES)
}

/// A harmless attribute for a wrapping span; never hides its content.
pub fn decorative_attribute(entropy: &dyn Entropy) -> String {
    match *pick(entropy, DECORATIVE_ATTRIBUTES) {
        "style" => r#"style="display:inline""#.to_string(),
        name => format!(r#"{name}="{}""#, identifier(entropy)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::RngEntropy;
    use crate::cloak::visible;

    #[test]
    fn every_strategy_preserves_visible_text_and_breaks_the_run() {
        let entropy = RngEntropy::seeded(21);
        for strategy in Strategy::ALL {
            for keyword in ["secret", "ab", "X", "Mañana"] {
                for _ in 0..40 {
                    let cloaked = strategy.apply(&entropy, keyword);
                    assert_eq!(visible(&cloaked), keyword, "{strategy:?} {cloaked}");
                    assert_ne!(cloaked, keyword, "{strategy:?} left {keyword} untouched");
                    if keyword.chars().count() > 1 {
                        assert!(!cloaked.contains(keyword), "{strategy:?} {cloaked}");
                    }
                }
            }
        }
    }

    #[test]
    fn single_char_interleave_gets_one_trailing_entity() {
        let entropy = RngEntropy::seeded(2);
        let cloaked = Strategy::Interleave.apply(&entropy, "Z");
        assert!(cloaked.starts_with('Z'));
        assert!(INVISIBLE_ENTITIES.contains(&&cloaked[1..]));
    }

    #[test]
    fn decorative_attributes_never_hide() {
        let entropy = RngEntropy::seeded(8);
        for _ in 0..200 {
            let attribute = decorative_attribute(&entropy);
            assert!(!attribute.contains("hidden"));
            assert!(!attribute.contains("font-size"));
            assert!(!attribute.contains("opacity"));
            if attribute.starts_with("style") {
                assert_eq!(attribute, r#"style="display:inline""#);
            }
        }
    }
}
