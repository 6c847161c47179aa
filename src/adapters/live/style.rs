//! Live `StyleMinifier`: a whitespace and comment compactor.

use crate::ports::{PortError, StyleMinifier};

/// Characters around which whitespace carries no meaning in CSS.
const TIGHT: &[char] = &['{', '}', ';', ',', '>'];

/// Strips comments, collapses whitespace and drops redundant semicolons.
///
/// String literals are copied verbatim. Whitespace is kept wherever removing
/// it could change meaning (descendant combinators, `calc()` operators,
/// `and (` in media queries).
pub struct CompactStyleMinifier;

impl StyleMinifier for CompactStyleMinifier {
    fn minify(&self, css: &str) -> Result<String, PortError> {
        let mut out = String::with_capacity(css.len());
        let mut chars = css.chars().peekable();
        let mut pending_space = false;

        while let Some(c) = chars.next() {
            match c {
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    let mut prev = '\0';
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if prev == '*' && inner == '/' {
                            closed = true;
                            break;
                        }
                        prev = inner;
                    }
                    if !closed {
                        return Err("unterminated comment in stylesheet".into());
                    }
                }
                '"' | '\'' => {
                    flush_space(&mut out, &mut pending_space, c);
                    out.push(c);
                    copy_string(&mut chars, &mut out, c)?;
                }
                c if c.is_whitespace() => pending_space = true,
                '}' => {
                    pending_space = false;
                    if out.ends_with(';') {
                        out.pop();
                    }
                    out.push(c);
                }
                c => {
                    flush_space(&mut out, &mut pending_space, c);
                    out.push(c);
                }
            }
        }

        Ok(out)
    }
}

/// Emits a single space for a run of whitespace unless either neighbour is tight.
fn flush_space(out: &mut String, pending_space: &mut bool, next: char) {
    if !std::mem::take(pending_space) {
        return;
    }
    let Some(last) = out.chars().last() else {
        return;
    };
    if TIGHT.contains(&last) || last == ':' || TIGHT.contains(&next) {
        return;
    }
    out.push(' ');
}

/// Copies a quoted string body (after the opening quote) including the closing quote.
fn copy_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    out: &mut String,
    quote: char,
) -> Result<(), PortError> {
    let mut escaped = false;
    for c in chars.by_ref() {
        out.push(c);
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok(());
        } else if c == '\n' {
            break;
        }
    }
    Err("unterminated string in stylesheet".into())
}
