//! DOM id renaming in HTML documents and stylesheets.
//!
//! Ids are collected from every HTML file, given random replacements, and
//! rewritten in `id`, `for`, single-id `aria-*` and `href="#..."` attributes
//! and in CSS selectors (standalone stylesheets and inline `<style>` blocks).

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tracing::{info, warn};

use crate::context::ServiceContext;
use crate::ledger::{Category, MappingLedger};
use crate::walk::{find_web_files, FileKind};

fn id_attribute() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(?:^|\s)id\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("id pattern is valid")
    })
}

fn valid_id() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][\w-]*$").expect("valid id pattern is valid"))
}

fn style_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)(<style\b[^>]*>)(.*?)(</style\s*>)").expect("style pattern is valid")
    })
}

/// Counts from one id renaming pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdsReport {
    /// New ids recorded in the ledger.
    pub recorded: usize,
    /// Files rewritten.
    pub updated: usize,
    /// Files that could not be read or written.
    pub failed: usize,
}

/// Collects id values from an HTML document, in order of appearance.
#[must_use]
pub fn collect_ids(html: &str) -> Vec<String> {
    id_attribute()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim())
        .filter(|id| valid_id().is_match(id))
        .map(str::to_string)
        .collect()
}

/// Records a random id for every id found in HTML below `root`, then
/// rewrites HTML and CSS files to use them.
///
/// # Errors
///
/// Returns an error if the tree cannot be walked or a pattern fails to compile.
pub fn rename_ids(ctx: &ServiceContext, root: &Path, ledger: &mut MappingLedger) -> Result<IdsReport, String> {
    let mut report = IdsReport::default();
    let files: Vec<_> = find_web_files(ctx, root)?
        .into_iter()
        .filter(|(_, kind)| *kind != FileKind::Script)
        .collect();

    let mut taken: HashSet<String> = ledger.entries(Category::Ids).values().cloned().collect();
    for (path, kind) in &files {
        if *kind != FileKind::Html {
            continue;
        }
        let Ok(html) = ctx.fs.read_to_string(path) else {
            continue;
        };
        for id in collect_ids(&html) {
            if ledger.lookup(Category::Ids, &id).is_some() {
                continue;
            }
            taken.insert(id.clone());
            let replacement = super::fresh_identifier(ctx.entropy.as_ref(), &mut taken);
            ledger.record(Category::Ids, id, replacement);
            report.recorded += 1;
        }
    }

    let Some(rules) = IdRewrite::new(ledger.entries(Category::Ids))? else {
        return Ok(report);
    };
    for (path, kind) in &files {
        match rewrite_file(ctx, &rules, path, *kind) {
            Ok(true) => report.updated += 1,
            Ok(false) => {}
            Err(e) => {
                warn!("{e}");
                report.failed += 1;
            }
        }
    }

    info!(recorded = report.recorded, updated = report.updated, failed = report.failed, "id renaming finished");
    Ok(report)
}

fn rewrite_file(ctx: &ServiceContext, rules: &IdRewrite, path: &Path, kind: FileKind) -> Result<bool, String> {
    let content = ctx
        .fs
        .read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let rewritten = match kind {
        FileKind::Html => rules.html(&content),
        FileKind::Css => rules.stylesheet(&content),
        FileKind::Script => return Ok(false),
    };
    if rewritten == content {
        return Ok(false);
    }
    ctx.fs
        .write(path, &rewritten)
        .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    Ok(true)
}

/// Compiled id rewriting rules for HTML attributes and CSS selectors.
pub struct IdRewrite<'a> {
    ids: &'a BTreeMap<String, String>,
    attribute: Regex,
    fragment: Regex,
    selector: Regex,
}

impl<'a> IdRewrite<'a> {
    /// Compiles rules for `ids`, or `None` when there are none.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern fails to compile.
    pub fn new(ids: &'a BTreeMap<String, String>) -> Result<Option<Self>, String> {
        if ids.is_empty() {
            return Ok(None);
        }
        let names = super::alternation(ids.keys());
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| format!("failed to compile id pattern: {e}"))
        };
        Ok(Some(Self {
            ids,
            attribute: compile(format!(
                r#"(?i:(\s(?:id|for|aria-labelledby|aria-describedby|aria-controls)\s*=\s*["']))({names})(["'])"#
            ))?,
            fragment: compile(format!(r#"(?i:(\shref\s*=\s*["'][^"'#]*#))({names})(["'])"#))?,
            selector: compile(format!(r"(#)({names})([^\w-]|$)"))?,
        }))
    }

    fn swap(&self, caps: &Captures<'_>) -> String {
        match self.ids.get(&caps[2]) {
            Some(new) => format!("{}{new}{}", &caps[1], &caps[3]),
            None => caps[0].to_string(),
        }
    }

    /// Rewrites id-bearing attributes and inline style selectors.
    #[must_use]
    pub fn html(&self, html: &str) -> String {
        let text = self.attribute.replace_all(html, |caps: &Captures<'_>| self.swap(caps));
        let text = self.fragment.replace_all(&text, |caps: &Captures<'_>| self.swap(caps));
        style_block()
            .replace_all(&text, |caps: &Captures<'_>| {
                format!("{}{}{}", &caps[1], self.stylesheet(&caps[2]), &caps[3])
            })
            .into_owned()
    }

    /// Rewrites `#id` in selectors only; declaration values such as colours
    /// are left alone.
    #[must_use]
    pub fn stylesheet(&self, css: &str) -> String {
        let mut out = String::with_capacity(css.len());
        let mut start = 0;
        for (i, c) in css.char_indices() {
            match c {
                '{' => {
                    out.push_str(&self.selector.replace_all(&css[start..i], |caps: &Captures<'_>| self.swap(caps)));
                    out.push('{');
                    start = i + 1;
                }
                '}' | ';' => {
                    out.push_str(&css[start..=i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
        out.push_str(&css[start..]);
        out
    }
}
