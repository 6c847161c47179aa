//! Keyword cloaking for HTML documents.
//!
//! Each configured keyword occurrence in document text is rewritten so the
//! page renders the same but the literal keyword no longer appears as one
//! contiguous run in the markup. See [`Strategy`] for the rewrites.

mod strategy;
mod tag;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};

use crate::context::ServiceContext;

pub use strategy::{decorative_attribute, Strategy, INVISIBLE_ENTITIES};
pub use tag::is_inside_tag;

/// A keyword and its case-insensitive matcher.
#[derive(Debug, Clone)]
pub struct Keyword {
    text: String,
    pattern: Regex,
}

impl Keyword {
    /// Compiles a literal keyword.
    ///
    /// # Errors
    ///
    /// Returns an error if the escaped literal is too large to compile.
    pub fn new(text: &str) -> Result<Self, String> {
        let pattern = RegexBuilder::new(&regex::escape(text))
            .case_insensitive(true)
            .build()
            .map_err(|e| format!("failed to compile keyword {text:?}: {e}"))?;
        Ok(Self { text: text.to_string(), pattern })
    }

    /// The keyword as configured.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Keywords ordered longest first, so a short keyword never splits a longer one.
#[derive(Debug, Clone, Default)]
pub struct KeywordList {
    keywords: Vec<Keyword>,
}

impl KeywordList {
    /// Builds a list from raw lines; lines are trimmed and blanks dropped.
    #[must_use]
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut keywords: Vec<Keyword> = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() || keywords.iter().any(|k| k.text == line) {
                continue;
            }
            match Keyword::new(line) {
                Ok(keyword) => keywords.push(keyword),
                Err(e) => warn!("{e}"),
            }
        }
        keywords.sort_by(|a, b| b.text.chars().count().cmp(&a.text.chars().count()));
        Self { keywords }
    }

    /// Reads a keyword file, one keyword per line.
    ///
    /// A missing or unreadable file is not an error: cloaking becomes a no-op.
    #[must_use]
    pub fn load(ctx: &ServiceContext, path: &Path) -> Self {
        if !ctx.fs.exists(path) {
            warn!(path = %path.display(), "keyword list not found; cloaking disabled");
            return Self::default();
        }
        match ctx.fs.read_to_string(path) {
            Ok(contents) => {
                let list = Self::from_lines(contents.lines());
                info!(path = %path.display(), keywords = list.len(), "keyword list loaded");
                list
            }
            Err(e) => {
                warn!(path = %path.display(), "failed to read keyword list: {e}");
                Self::default()
            }
        }
    }

    /// Number of keywords.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    /// Whether there are no keywords.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Keywords in processing order.
    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }
}

/// A byte range of the document that has been cloaked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    /// Start offset in bytes.
    pub offset: usize,
    /// Length in bytes.
    pub length: usize,
    /// The keyword that produced the span.
    pub keyword: String,
}

impl MatchSpan {
    /// Whether the two byte ranges share at least one byte.
    #[must_use]
    pub fn overlaps(&self, other: &MatchSpan) -> bool {
        self.offset < other.offset + other.length && other.offset < self.offset + self.length
    }
}

/// Result of cloaking one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cloaked {
    /// The rewritten document.
    pub text: String,
    /// Occurrences cloaked.
    pub count: usize,
}

/// Cloaks keywords in HTML. One instance per output copy; the keyword list
/// is read on first use and reused for every document of that copy.
#[derive(Debug, Default)]
pub struct KeywordCloaker {
    source: Option<PathBuf>,
    list: OnceLock<KeywordList>,
}

impl KeywordCloaker {
    /// A cloaker that loads its keywords from `source` on first use.
    #[must_use]
    pub fn from_file(source: Option<PathBuf>) -> Self {
        Self { source, list: OnceLock::new() }
    }

    /// A cloaker with an already-built list.
    #[must_use]
    pub fn with_keywords(list: KeywordList) -> Self {
        Self { source: None, list: OnceLock::from(list) }
    }

    /// The keyword list, loading it if needed.
    pub fn keywords(&self, ctx: &ServiceContext) -> &KeywordList {
        self.list.get_or_init(|| match &self.source {
            Some(path) => KeywordList::load(ctx, path),
            None => KeywordList::default(),
        })
    }

    /// Cloaks every eligible keyword occurrence in `html`.
    pub fn cloak(&self, ctx: &ServiceContext, html: &str) -> Cloaked {
        let keywords = self.keywords(ctx);
        let mut text = html.to_string();
        let mut cloaked: Vec<MatchSpan> = Vec::new();

        for keyword in keywords.iter() {
            let found: Vec<(usize, usize)> =
                keyword.pattern.find_iter(&text).map(|m| (m.start(), m.end())).collect();

            // Back to front, so earlier offsets of this keyword stay valid.
            for (start, end) in found.into_iter().rev() {
                let candidate =
                    MatchSpan { offset: start, length: end - start, keyword: keyword.text.clone() };
                if cloaked.iter().any(|span| span.overlaps(&candidate)) {
                    continue;
                }
                if is_inside_tag(&text, start, end - start) {
                    continue;
                }

                let strategy = Strategy::choose(ctx.entropy.as_ref());
                let replacement = strategy.apply(ctx.entropy.as_ref(), &text[start..end]);
                for span in &mut cloaked {
                    if span.offset >= end {
                        span.offset = span.offset - (end - start) + replacement.len();
                    }
                }
                text.replace_range(start..end, &replacement);
                debug!(keyword = %keyword.text, ?strategy, offset = start, "keyword cloaked");
                cloaked.push(MatchSpan { offset: start, length: replacement.len(), ..candidate });
            }
        }

        Cloaked { text, count: cloaked.len() }
    }
}

/// Strips tags and zero-width entities, leaving what a reader sees.
#[cfg(test)]
pub(crate) fn visible(html: &str) -> String {
    let mut text = String::new();
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    for entity in INVISIBLE_ENTITIES {
        text = text.replace(entity, "");
    }
    text
}
