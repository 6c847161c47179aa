//! Processing markers stamped on the first line of every handled file.

use std::sync::OnceLock;

use regex::Regex;

use crate::context::ServiceContext;
use crate::naming;
use crate::walk::FileKind;

/// Markers written by earlier releases; any of them anywhere means "done".
pub const LEGACY_MARKERS: &[&str] = &["<!-- OBFUSCATED", "/* OBFUSCATED", "// OBFUSCATED"];

fn marker_line() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?:<!--|/\*) [A-Z]+_[A-Z]+_\d{4}_[0-9a-z]+ (?:-->|\*/)")
            .expect("marker pattern is valid")
    })
}

/// Whether `content` has already been processed.
#[must_use]
pub fn is_marked(content: &str) -> bool {
    let first_line = content.lines().next().unwrap_or_default();
    marker_line().is_match(first_line) || LEGACY_MARKERS.iter().any(|m| content.contains(m))
}

/// Renders a marker body as a comment valid for `kind`.
#[must_use]
pub fn render(kind: FileKind, body: &str) -> String {
    match kind {
        FileKind::Html => format!("<!-- {body} -->"),
        FileKind::Css | FileKind::Script => format!("/* {body} */"),
    }
}

/// Prepends a freshly drawn marker line to `content`.
#[must_use]
pub fn stamp(ctx: &ServiceContext, kind: FileKind, content: &str) -> String {
    let body = naming::marker(ctx.entropy.as_ref(), ctx.clock.epoch_millis());
    format!("{}\n{content}", render(kind, &body))
}
