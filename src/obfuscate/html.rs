//! Whole-document pass for HTML files.
//!
//! Works on the raw text with targeted patterns; no DOM is built. Inline
//! `<style>` bodies go to the style minifier on the blocking pool and are
//! awaited together before the document is reassembled.

use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};
use tokio::task::JoinSet;
use tracing::warn;

use crate::cloak::KeywordCloaker;
use crate::context::ServiceContext;
use crate::naming;
use crate::ports::ScriptOptions;

fn style_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)(<style\b[^>]*>)(.*?)(</style\s*>)").expect("style pattern is valid")
    })
}

fn script_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)(<script\b([^>]*)>)(.*?)(</script\s*>)").expect("script pattern is valid")
    })
}

fn raw_text_block() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
            .expect("raw text pattern is valid")
    })
}

fn start_tag() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"<[A-Za-z][\w-]*(?:\s+[^\s=>/]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+))?)*\s*/?>"#)
            .expect("tag pattern is valid")
    })
}

fn event_handler() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(\son[a-z]+\s*=\s*)(?:"([^"]*)"|'([^']*)')"#).expect("handler pattern is valid")
    })
}

fn comment() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"))
}

fn src_attribute() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\bsrc\s*=").expect("src pattern is valid"))
}

fn type_attribute() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\btype\s*=\s*["']?([^"'\s>]+)"#).expect("type pattern is valid")
    })
}

fn body_close() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)</body\s*>").expect("body pattern is valid"))
}

/// What happened to one HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlOutcome {
    /// The rewritten document, without marker.
    pub text: String,
    /// Inline style blocks minified.
    pub styles: usize,
    /// Inline scripts handed to the script obfuscator.
    pub scripts: usize,
    /// `on*` event handler attributes handed to the script obfuscator.
    pub handlers: usize,
    /// Collaborator calls that failed and kept the original text.
    pub fallbacks: usize,
    /// Keyword occurrences cloaked.
    pub cloaked: usize,
}

/// Runs the HTML pipeline: styles, scripts and handlers, comments, keywords, decoy.
pub async fn obfuscate_document(
    ctx: &ServiceContext,
    html: &str,
    options: &ScriptOptions<'_>,
    cloaker: &KeywordCloaker,
) -> HtmlOutcome {
    let mut outcome = HtmlOutcome::default();

    let text = minify_inline_styles(ctx, html, &mut outcome).await;
    let text = obfuscate_inline_scripts(ctx, &text, options, &mut outcome);
    let text = if options.globals.is_empty() {
        text
    } else {
        outside_raw_text(&text, |segment| obfuscate_event_handlers(ctx, segment, options, &mut outcome))
    };
    let text = outside_raw_text(&text, |segment| comment().replace_all(segment, "").into_owned());

    let cloaked = cloaker.cloak(ctx, &text);
    outcome.cloaked = cloaked.count;

    outcome.text = append_decoy(ctx, &cloaked.text);
    outcome
}

async fn minify_inline_styles(ctx: &ServiceContext, html: &str, outcome: &mut HtmlOutcome) -> String {
    let bodies: Vec<String> =
        style_block().captures_iter(html).map(|caps| caps[2].to_string()).collect();
    if bodies.is_empty() {
        return html.to_string();
    }

    let mut tasks = JoinSet::new();
    for (index, body) in bodies.iter().enumerate() {
        if body.trim().is_empty() {
            continue;
        }
        let minifier = Arc::clone(&ctx.styles);
        let body = body.clone();
        tasks.spawn_blocking(move || (index, minifier.minify(&body)));
    }

    let mut minified = bodies;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, Ok(css))) => {
                minified[index] = css;
                outcome.styles += 1;
            }
            Ok((index, Err(e))) => {
                warn!(block = index, "inline style minification failed, keeping original: {e}");
                outcome.fallbacks += 1;
            }
            Err(e) => {
                warn!("inline style task failed, keeping original: {e}");
                outcome.fallbacks += 1;
            }
        }
    }

    let mut next = 0;
    style_block()
        .replace_all(html, |caps: &Captures<'_>| {
            let body = minified.get(next).map_or(&caps[2], String::as_str);
            next += 1;
            format!("{}{body}{}", &caps[1], &caps[3])
        })
        .into_owned()
}

fn obfuscate_inline_scripts(
    ctx: &ServiceContext,
    html: &str,
    options: &ScriptOptions<'_>,
    outcome: &mut HtmlOutcome,
) -> String {
    script_block()
        .replace_all(html, |caps: &Captures<'_>| {
            let attributes = &caps[2];
            let body = &caps[3];
            if src_attribute().is_match(attributes) || body.trim().is_empty() || !is_script_type(attributes) {
                return caps[0].to_string();
            }
            match ctx.scripts.obfuscate(body, options) {
                Ok(code) => {
                    outcome.scripts += 1;
                    format!("{}{code}{}", &caps[1], &caps[4])
                }
                Err(e) => {
                    warn!("inline script obfuscation failed, keeping original: {e}");
                    outcome.fallbacks += 1;
                    caps[0].to_string()
                }
            }
        })
        .into_owned()
}

/// Runs `on*` attribute values inside start tags through the script obfuscator.
///
/// Double-quoted values are read with `&quot;` decoded and written back
/// re-encoded.
fn obfuscate_event_handlers(
    ctx: &ServiceContext,
    html: &str,
    options: &ScriptOptions<'_>,
    outcome: &mut HtmlOutcome,
) -> String {
    start_tag()
        .replace_all(html, |tag: &Captures<'_>| {
            event_handler()
                .replace_all(&tag[0], |caps: &Captures<'_>| {
                    let (code, quote) = match caps.get(2) {
                        Some(value) => (value.as_str().replace("&quot;", "\""), '"'),
                        None => (caps[3].to_string(), '\''),
                    };
                    match ctx.scripts.obfuscate(&code, options) {
                        Ok(code) => {
                            outcome.handlers += 1;
                            let code = if quote == '"' { code.replace('"', "&quot;") } else { code };
                            format!("{}{quote}{code}{quote}", &caps[1])
                        }
                        Err(e) => {
                            warn!("event handler obfuscation failed, keeping original: {e}");
                            outcome.fallbacks += 1;
                            caps[0].to_string()
                        }
                    }
                })
                .into_owned()
        })
        .into_owned()
}

/// Data blocks such as JSON-LD or templates are not code.
fn is_script_type(attributes: &str) -> bool {
    type_attribute().captures(attributes).map_or(true, |caps| {
        let kind = caps[1].to_ascii_lowercase();
        matches!(kind.as_str(), "module" | "text/javascript" | "application/javascript" | "text/ecmascript")
    })
}

/// Applies `f` to the parts of `html` outside `<script>` and `<style>` elements.
fn outside_raw_text(html: &str, mut f: impl FnMut(&str) -> String) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for block in raw_text_block().find_iter(html) {
        out.push_str(&f(&html[last..block.start()]));
        out.push_str(block.as_str());
        last = block.end();
    }
    out.push_str(&f(&html[last..]));
    out
}

fn append_decoy(ctx: &ServiceContext, html: &str) -> String {
    let decoy = format!(
        r#"<div style="display:none!important" class="{}"></div>"#,
        naming::identifier(ctx.entropy.as_ref())
    );
    match body_close().find_iter(html).last() {
        Some(close) => format!("{}{decoy}{}", &html[..close.start()], &html[close.start()..]),
        None => format!("{html}{decoy}"),
    }
}
