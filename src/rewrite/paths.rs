//! File-path reference patterns.
//!
//! Each [`PathClass`] is one syntactic position a path can occupy. All
//! original paths from the ledger are folded into a single alternation per
//! class (longest first), so a reference is rewritten at most once per class
//! and the most specific original wins.

use std::borrow::Cow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use regex::{Captures, Regex, RegexBuilder};
use tracing::debug;

/// Compiled patterns can grow large for projects with many files.
const PATTERN_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Syntactic positions a file path can appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// `src`, `href`, `data-src`, `data-href` attribute values.
    Attribute,
    /// CSS `url(...)`.
    CssUrl,
    /// `import(...)` and `require(...)` calls.
    DynamicImport,
    /// `import ... from '...'` and bare `import '...'`.
    StaticImport,
}

impl PathClass {
    /// Every class, in application order.
    pub const ALL: [PathClass; 4] =
        [PathClass::Attribute, PathClass::CssUrl, PathClass::DynamicImport, PathClass::StaticImport];

    /// Pattern with groups: 1 = lead-in, 2 = kept prefix, 3 = original path, 4 = tail.
    fn pattern(self, alternation: &str) -> String {
        match self {
            PathClass::Attribute => format!(
                r#"((?:src|href|data-src|data-href)\s*=\s*["'])([^"']*?)({alternation})((?:[?#][^"']*)?["'])"#
            ),
            PathClass::CssUrl => format!(
                r#"(url\s*\(\s*["']?)([^"'()\s]*?)({alternation})((?:[?#][^"'()\s]*)?["']?\s*\))"#
            ),
            PathClass::DynamicImport => format!(
                r#"((?:import|require)\s*\(\s*["'])([^"']*?)({alternation})(["']\s*\))"#
            ),
            PathClass::StaticImport => {
                format!(r#"(import\s+[^"']*?["'])([^"']*?)({alternation})(["'])"#)
            }
        }
    }
}

/// Compiled path rules for one ledger's `files` mapping.
pub(crate) struct PathRules {
    classes: Vec<(PathClass, Regex)>,
    /// Original path -> new path, as recorded.
    exact: HashMap<String, String>,
    /// Lower-cased original path -> new path; the first of a case-only clash wins.
    folded: HashMap<String, String>,
    /// Lower-cased new paths, used to recognize references already rewritten.
    new_paths: Vec<String>,
}

impl PathRules {
    /// Builds the rules, or `None` when there is nothing to rewrite.
    pub(crate) fn new<'a, I>(mappings: I) -> Result<Option<Self>, String>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let mut exact = HashMap::new();
        let mut folded = HashMap::new();
        let mut originals: Vec<&str> = Vec::new();
        let mut new_paths = Vec::new();
        for (original, new) in mappings {
            exact.insert(original.clone(), new.clone());
            match folded.entry(original.to_ascii_lowercase()) {
                Entry::Vacant(slot) => {
                    slot.insert(new.clone());
                    originals.push(original);
                }
                Entry::Occupied(_) => debug!(path = %original, "original differs from another only by case"),
            }
            new_paths.push(new.to_ascii_lowercase());
        }
        if originals.is_empty() {
            return Ok(None);
        }

        originals.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation =
            originals.iter().map(|o| regex::escape(o)).collect::<Vec<_>>().join("|");

        let mut classes = Vec::with_capacity(PathClass::ALL.len());
        for class in PathClass::ALL {
            let regex = RegexBuilder::new(&class.pattern(&alternation))
                .case_insensitive(true)
                .size_limit(PATTERN_SIZE_LIMIT)
                .build()
                .map_err(|e| format!("failed to compile {class:?} path pattern: {e}"))?;
            classes.push((class, regex));
        }

        Ok(Some(Self { classes, exact, folded, new_paths }))
    }

    /// Applies one class to `text`.
    pub(crate) fn apply<'t>(&self, class: PathClass, text: &'t str) -> Cow<'t, str> {
        let Some((_, regex)) = self.classes.iter().find(|(c, _)| *c == class) else {
            return Cow::Borrowed(text);
        };
        regex.replace_all(text, |caps: &Captures<'_>| {
            let prefix = &caps[2];
            let original = &caps[3];
            let target =
                self.exact.get(original).or_else(|| self.folded.get(&original.to_ascii_lowercase()));
            match target {
                Some(new) if !self.already_rewritten(prefix, original) => {
                    format!("{}{prefix}{new}{}", &caps[1], &caps[4])
                }
                _ => caps[0].to_string(),
            }
        })
    }

    /// A value that already names a new path must not be rewritten again,
    /// which can happen when a kept file name is also a suffix of an original.
    fn already_rewritten(&self, prefix: &str, original: &str) -> bool {
        let value = format!("{prefix}{original}").to_ascii_lowercase();
        self.new_paths.iter().any(|new| {
            value == *new
                || value.strip_suffix(new.as_str()).is_some_and(|head| head.ends_with('/'))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn rules(pairs: &[(&str, &str)]) -> PathRules {
        let map: BTreeMap<String, String> =
            pairs.iter().map(|(a, b)| ((*a).to_string(), (*b).to_string())).collect();
        PathRules::new(&map).unwrap().unwrap()
    }

    #[test]
    fn attribute_keeps_prefix_and_query() {
        let rules = rules(&[("assets/logo.png", "res_1/asset_9.png")]);
        let html = r#"<img SRC="../old/assets/logo.png?v=2"><a href='assets/logo.png#top'>x</a>"#;
        assert_eq!(
            rules.apply(PathClass::Attribute, html),
            r#"<img SRC="../old/res_1/asset_9.png?v=2"><a href='res_1/asset_9.png#top'>x</a>"#
        );
    }

    #[test]
    fn data_attributes_are_covered() {
        let rules = rules(&[("img/a.jpg", "lib_2/item_1.jpg")]);
        let html = r#"<div data-src="img/a.jpg" data-href = "./img/a.jpg"></div>"#;
        assert_eq!(
            rules.apply(PathClass::Attribute, html),
            r#"<div data-src="lib_2/item_1.jpg" data-href = "./lib_2/item_1.jpg"></div>"#
        );
    }

    #[test]
    fn css_url_with_and_without_quotes() {
        let rules = rules(&[("images/bg.png", "core_3/res_4.png")]);
        let css = "a{background:url(images/bg.png)} b{background:URL( \"../images/bg.png\" )}";
        assert_eq!(
            rules.apply(PathClass::CssUrl, css),
            "a{background:url(core_3/res_4.png)} b{background:URL( \"../core_3/res_4.png\" )}"
        );
    }

    #[test]
    fn css_url_prefix_does_not_span_other_urls() {
        let rules = rules(&[("b.png", "x_1/y.png")]);
        let css = "a{background:url(a.png), url(img/b.png)}";
        assert_eq!(rules.apply(PathClass::CssUrl, css), "a{background:url(a.png), url(img/x_1/y.png)}");
    }

    #[test]
    fn dynamic_and_static_imports() {
        let rules = rules(&[("js/util.js", "mod_5/comp_6.js")]);
        let js = "const u = require('./js/util.js');\nimport('./js/util.js');\nimport { a } from \"./js/util.js\";\nimport './js/util.js';";
        let step = rules.apply(PathClass::DynamicImport, js);
        let done = rules.apply(PathClass::StaticImport, &step);
        assert_eq!(
            done,
            "const u = require('./mod_5/comp_6.js');\nimport('./mod_5/comp_6.js');\nimport { a } from \"./mod_5/comp_6.js\";\nimport './mod_5/comp_6.js';"
        );
    }

    #[test]
    fn longest_original_wins() {
        let rules = rules(&[("guide.html", "lib_a/guide.html"), ("docs/guide.html", "app_b/guide.html")]);
        let html = r#"<a href="docs/guide.html">d</a><a href="guide.html">g</a>"#;
        assert_eq!(
            rules.apply(PathClass::Attribute, html),
            r#"<a href="app_b/guide.html">d</a><a href="lib_a/guide.html">g</a>"#
        );
    }

    #[test]
    fn originals_differing_only_by_case_keep_their_own_targets() {
        let rules = rules(&[("img/Logo.png", "lib_1/a.png"), ("img/logo.png", "lib_2/b.png")]);
        let html = r#"<img src="img/Logo.png"><img src="img/logo.png"><img src="IMG/LOGO.PNG">"#;
        assert_eq!(
            rules.apply(PathClass::Attribute, html),
            r#"<img src="lib_1/a.png"><img src="lib_2/b.png"><img src="lib_1/a.png">"#
        );
    }

    #[test]
    fn rewritten_values_are_not_rewritten_again() {
        let rules = rules(&[("guide.html", "lib_a/guide.html")]);
        let html = r#"<a href="lib_a/guide.html">g</a>"#;
        assert_eq!(rules.apply(PathClass::Attribute, html), html);
    }

    #[test]
    fn unrelated_text_is_borrowed() {
        let rules = rules(&[("a.css", "b/c.css")]);
        assert!(matches!(rules.apply(PathClass::Attribute, "<p>a.css</p>"), Cow::Borrowed(_)));
    }

    #[test]
    fn empty_mapping_builds_nothing() {
        let map: BTreeMap<String, String> = BTreeMap::new();
        assert!(PathRules::new(&map).unwrap().is_none());
    }
}
