//! DOM id references inside scripts.

use std::borrow::Cow;
use std::collections::HashMap;

use regex::{Captures, Regex};

/// Call and selector shapes that name an element id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IdShape {
    GetElementById,
    QuerySelectorAll,
    QuerySelector,
    QuotedSelector,
}

impl IdShape {
    /// Call shapes come first; the bare quoted selector is the catch-all.
    const ALL: [IdShape; 4] =
        [IdShape::GetElementById, IdShape::QuerySelectorAll, IdShape::QuerySelector, IdShape::QuotedSelector];

    fn pattern(self, alternation: &str) -> String {
        match self {
            IdShape::GetElementById => {
                format!(r#"getElementById\s*\(\s*(['"`])({alternation})(['"`])\s*\)"#)
            }
            IdShape::QuerySelectorAll => {
                format!(r#"querySelectorAll\s*\(\s*(['"`])#({alternation})([^\w-]|$)"#)
            }
            IdShape::QuerySelector => {
                format!(r#"querySelector\s*\(\s*(['"`])#({alternation})([^\w-]|$)"#)
            }
            IdShape::QuotedSelector => format!(r#"(['"`])#({alternation})([^\w-]|$)"#),
        }
    }

    fn render(self, quote: &str, id: &str, tail: &str) -> String {
        match self {
            IdShape::GetElementById => format!("getElementById({quote}{id}{tail})"),
            IdShape::QuerySelectorAll => format!("querySelectorAll({quote}#{id}{tail}"),
            IdShape::QuerySelector => format!("querySelector({quote}#{id}{tail}"),
            IdShape::QuotedSelector => format!("{quote}#{id}{tail}"),
        }
    }
}

/// Compiled id rules for one ledger's `ids` mapping. Ids are case-sensitive.
pub(crate) struct IdRules {
    shapes: Vec<(IdShape, Regex)>,
    targets: HashMap<String, String>,
}

impl IdRules {
    pub(crate) fn new<'a, I>(mappings: I) -> Result<Option<Self>, String>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        let targets: HashMap<String, String> =
            mappings.into_iter().map(|(a, b)| (a.clone(), b.clone())).collect();
        if targets.is_empty() {
            return Ok(None);
        }

        let mut ids: Vec<&str> = targets.keys().map(String::as_str).collect();
        ids.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let alternation = ids.iter().map(|id| regex::escape(id)).collect::<Vec<_>>().join("|");

        let mut shapes = Vec::with_capacity(IdShape::ALL.len());
        for shape in IdShape::ALL {
            let regex = Regex::new(&shape.pattern(&alternation))
                .map_err(|e| format!("failed to compile {shape:?} id pattern: {e}"))?;
            shapes.push((shape, regex));
        }
        Ok(Some(Self { shapes, targets }))
    }

    /// Applies every shape in order.
    pub(crate) fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let mut out = Cow::Borrowed(text);
        for (shape, regex) in &self.shapes {
            let replaced = regex.replace_all(&out, |caps: &Captures<'_>| {
                match self.targets.get(&caps[2]) {
                    Some(new) => shape.render(&caps[1], new, &caps[3]),
                    None => caps[0].to_string(),
                }
            });
            if let Cow::Owned(text) = replaced {
                out = Cow::Owned(text);
            }
        }
        out
    }
}
