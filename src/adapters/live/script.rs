//! Live `ScriptObfuscator`: renames global identifiers decided for the copy.
//!
//! A single forward scan tracks just enough syntax to tell references from
//! names that belong to an object: string, regex and comment text is copied
//! untouched, `${...}` inside template literals is scanned as code, and
//! property accesses, object keys and class members keep their names.
//! Shorthand properties are expanded so the key survives (`{ init }` becomes
//! `{ init: Qx7a }`).

use std::collections::BTreeMap;

use crate::ports::{PortError, ScriptObfuscator, ScriptOptions};

/// Keywords after which a `/` starts a regex literal rather than a division.
const REGEX_AFTER: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do", "else",
    "yield", "await",
];

/// Words that may precede a class member name.
const MEMBER_MODIFIERS: &[&str] = &["static", "get", "set", "async", "accessor"];

/// Applies the copy's global renames to code outside strings and comments.
pub struct GlobalRenamingObfuscator;

impl ScriptObfuscator for GlobalRenamingObfuscator {
    fn obfuscate(&self, source: &str, options: &ScriptOptions<'_>) -> Result<String, PortError> {
        if options.globals.is_empty() {
            return Ok(source.to_string());
        }
        let mut renamer = Renamer::new(source, options.globals);
        renamer.code(false)?;
        Ok(renamer.out)
    }
}

/// The last significant token seen, which decides how the next one reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prev<'a> {
    Start,
    Punct(u8),
    Word(&'a str),
    /// A literal or closed group; a following `/` divides.
    Value,
}

struct Renamer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    globals: &'a BTreeMap<String, String>,
    out: String,
    pos: usize,
    /// Open brackets: `(`, `[`, `{` for object literals and blocks, `c` for class bodies.
    brackets: Vec<u8>,
    prev: Prev<'a>,
    newline: bool,
    /// Bracket depth at which a `class` heading awaits its body.
    class_heading: Option<usize>,
}

impl<'a> Renamer<'a> {
    fn new(src: &'a str, globals: &'a BTreeMap<String, String>) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            globals,
            out: String::with_capacity(src.len()),
            pos: 0,
            brackets: Vec::new(),
            prev: Prev::Start,
            newline: false,
            class_heading: None,
        }
    }

    /// Scans code until the end of input, or, inside a template
    /// substitution, until the `}` that closes it (left unconsumed).
    fn code(&mut self, in_template: bool) -> Result<(), PortError> {
        while let Some(&byte) = self.bytes.get(self.pos) {
            match byte {
                b'\n' => {
                    self.newline = true;
                    self.copy_to(self.pos + 1);
                }
                b' ' | b'\t' | b'\r' => self.copy_to(self.pos + 1),
                b'\'' | b'"' => {
                    let end = skip_quoted(self.bytes, self.pos)?;
                    self.copy_to(end);
                    self.set_prev(Prev::Value);
                }
                b'`' => {
                    self.template()?;
                    self.set_prev(Prev::Value);
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    let end = self.src[self.pos..].find('\n').map_or(self.bytes.len(), |p| self.pos + p);
                    self.copy_to(end);
                }
                b'/' if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    let close = self.src[self.pos + 2..]
                        .find("*/")
                        .ok_or("unterminated block comment in script")?;
                    self.copy_to(self.pos + 2 + close + 2);
                }
                b'/' => match self.regex_end() {
                    Some(end) => {
                        self.copy_to(end);
                        self.set_prev(Prev::Value);
                    }
                    None => self.punct(byte),
                },
                b'{' => {
                    let kind = if self.class_heading == Some(self.brackets.len()) {
                        self.class_heading = None;
                        b'c'
                    } else {
                        b'{'
                    };
                    self.brackets.push(kind);
                    self.punct(byte);
                }
                b'(' | b'[' => {
                    self.brackets.push(byte);
                    self.punct(byte);
                }
                b'}' if in_template && self.brackets.is_empty() => return Ok(()),
                b'}' => {
                    self.brackets.pop();
                    self.punct(byte);
                }
                b')' | b']' => {
                    self.brackets.pop();
                    self.copy_to(self.pos + 1);
                    self.set_prev(Prev::Value);
                }
                b';' => {
                    if self.class_heading == Some(self.brackets.len()) {
                        self.class_heading = None;
                    }
                    self.punct(byte);
                }
                b'0'..=b'9' => {
                    let end = self.scan_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.');
                    self.copy_to(end);
                    self.set_prev(Prev::Value);
                }
                b if is_identifier_byte(b) => self.identifier(),
                _ => self.punct(byte),
            }
        }
        if in_template {
            return Err("unterminated template literal in script".into());
        }
        Ok(())
    }

    /// Copies a template literal, scanning each `${...}` as code.
    fn template(&mut self) -> Result<(), PortError> {
        self.copy_to(self.pos + 1);
        loop {
            let rest = &self.bytes[self.pos..];
            let Some(offset) = rest.iter().position(|&b| matches!(b, b'\\' | b'`' | b'$')) else {
                return Err("unterminated template literal in script".into());
            };
            self.copy_to(self.pos + offset);
            match self.bytes[self.pos] {
                b'\\' => {
                    let escaped = self.src[self.pos + 1..].chars().next().map_or(0, char::len_utf8);
                    self.copy_to(self.pos + 1 + escaped);
                }
                b'`' => {
                    self.copy_to(self.pos + 1);
                    return Ok(());
                }
                _ if self.bytes.get(self.pos + 1) == Some(&b'{') => {
                    self.copy_to(self.pos + 2);
                    let outer = std::mem::take(&mut self.brackets);
                    let outer_heading = self.class_heading.take();
                    self.prev = Prev::Start;
                    self.code(true)?;
                    self.brackets = outer;
                    self.class_heading = outer_heading;
                    self.copy_to(self.pos + 1);
                }
                _ => self.copy_to(self.pos + 1),
            }
        }
    }

    fn identifier(&mut self) {
        let start = self.pos;
        let end = self.scan_while(is_identifier_byte);
        let (src, globals) = (self.src, self.globals);
        let name = &src[start..end];
        self.pos = end;

        if name == "class" {
            self.class_heading = Some(self.brackets.len());
        }

        match globals.get(name) {
            Some(renamed) if !self.is_property_access(start) && !self.is_member_name(start, end) => {
                if self.is_shorthand_property(end) {
                    self.out.push_str(name);
                    self.out.push_str(": ");
                }
                self.out.push_str(renamed);
            }
            _ => self.out.push_str(name),
        }
        self.set_prev(Prev::Word(name));
    }

    /// `obj.name`, `obj?.name` or `#name`, but not a spread `...name`.
    fn is_property_access(&self, start: usize) -> bool {
        match self.prev {
            Prev::Punct(b'#') => true,
            Prev::Punct(b'.') => !self.src[..start].trim_end().ends_with("..."),
            _ => false,
        }
    }

    /// Names owned by an object literal or class body rather than scope.
    fn is_member_name(&self, start: usize, end: usize) -> bool {
        match self.brackets.last() {
            Some(b'{') => {
                let next = self.next_significant(end);
                let after_separator = matches!(self.prev, Prev::Punct(b'{' | b','));
                (after_separator && next == Some(b':')) || (next == Some(b'(') && self.is_method_head(start, end))
            }
            Some(b'c') => {
                let starts_member = match self.prev {
                    Prev::Punct(b'{' | b';' | b'}' | b'*') => true,
                    Prev::Word(word) => MEMBER_MODIFIERS.contains(&word),
                    Prev::Value => self.newline,
                    _ => false,
                };
                starts_member && !matches!(self.next_significant(end), Some(b'.'))
            }
            _ => false,
        }
    }

    /// `{ init }`, `{ a, init }` or `{ init = fallback }` inside braces.
    fn is_shorthand_property(&self, end: usize) -> bool {
        self.brackets.last() == Some(&b'{')
            && matches!(self.prev, Prev::Punct(b'{' | b','))
            && matches!(self.next_significant(end), Some(b'}' | b',' | b'='))
            && !self.src[end..].trim_start().starts_with("=>")
    }

    /// A method shorthand `name(...) {` that is not a function declaration.
    fn is_method_head(&self, start: usize, end: usize) -> bool {
        let declared = match self.prev {
            Prev::Word("function") => true,
            Prev::Punct(b'*') => self.src[..start].trim_end().trim_end_matches('*').trim_end().ends_with("function"),
            _ => false,
        };
        if declared {
            return false;
        }
        let Some(open) = self.src[end..].find('(').map(|p| end + p) else {
            return false;
        };
        matching_paren(self.bytes, open).is_some_and(|close| self.next_significant(close) == Some(b'{'))
    }

    /// End of a regex literal starting at the current `/`, if one may start here.
    fn regex_end(&self) -> Option<usize> {
        let allowed = match self.prev {
            Prev::Start | Prev::Punct(_) => true,
            Prev::Word(word) => REGEX_AFTER.contains(&word),
            Prev::Value => false,
        };
        if !allowed {
            return None;
        }
        let mut i = self.pos + 1;
        let mut in_class = false;
        while let Some(&byte) = self.bytes.get(i) {
            match byte {
                b'\\' => i += 2,
                b'\n' => return None,
                b'[' => {
                    in_class = true;
                    i += 1;
                }
                b']' => {
                    in_class = false;
                    i += 1;
                }
                b'/' if !in_class => {
                    let flags = self.bytes[i + 1..].iter().take_while(|b| b.is_ascii_alphabetic()).count();
                    return Some(i + 1 + flags);
                }
                _ => i += 1,
            }
        }
        None
    }

    fn punct(&mut self, byte: u8) {
        self.copy_to(self.pos + 1);
        self.set_prev(Prev::Punct(byte));
    }

    fn set_prev(&mut self, prev: Prev<'a>) {
        self.prev = prev;
        self.newline = false;
    }

    fn copy_to(&mut self, end: usize) {
        let end = end.min(self.bytes.len());
        self.out.push_str(&self.src[self.pos..end]);
        self.pos = end;
    }

    fn scan_while(&self, keep: impl Fn(u8) -> bool) -> usize {
        self.bytes[self.pos..].iter().position(|&b| !keep(b)).map_or(self.bytes.len(), |p| self.pos + p)
    }

    fn next_significant(&self, from: usize) -> Option<u8> {
        self.bytes[from..].iter().copied().find(|b| !b.is_ascii_whitespace())
    }
}

/// ASCII identifier characters plus any non-ASCII byte, so multi-byte
/// identifiers are kept whole.
fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80
}

/// Returns the byte offset just past the `)` matching the `(` at `open`.
fn matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while let Some(&byte) = bytes.get(i) {
        match byte {
            b'\'' | b'"' | b'`' => {
                i = skip_quoted(bytes, i).ok()?;
                continue;
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Returns the byte offset just past the closing quote of the literal at `start`.
fn skip_quoted(bytes: &[u8], start: usize) -> Result<usize, PortError> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Ok(i + 1),
            b'\n' if quote != b'`' => break,
            _ => i += 1,
        }
    }
    Err("unterminated string literal in script".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn globals(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    fn rename(pairs: &[(&str, &str)], src: &str) -> String {
        let map = globals(pairs);
        let options = ScriptOptions { globals: &map, source: None };
        GlobalRenamingObfuscator.obfuscate(src, &options).unwrap()
    }

    #[test]
    fn no_globals_is_identity() {
        let map = BTreeMap::new();
        let options = ScriptOptions { globals: &map, source: None };
        let src = "function init() { return 1; }";
        assert_eq!(GlobalRenamingObfuscator.obfuscate(src, &options).unwrap(), src);
    }

    #[test]
    fn renames_identifiers_outside_strings_and_properties() {
        let src = "var counter = 0;\nfunction init(){ counter++; app.init(); log('init counter'); }\n// init\ninit(counter);";
        assert_eq!(
            rename(&[("init", "Qx7a"), ("counter", "Zk2")], src),
            "var Zk2 = 0;\nfunction Qx7a(){ Zk2++; app.init(); log('init counter'); }\n// init\nQx7a(Zk2);"
        );
    }

    #[test]
    fn prefixes_of_longer_identifiers_are_untouched() {
        assert_eq!(rename(&[("init", "Qx7a")], "initAll(); $init(); init$;"), "initAll(); $init(); init$;");
    }

    #[test]
    fn object_keys_keep_their_names() {
        let src = "var counter = 0;\nvar o = { counter: 1, total: counter };\nlog(o.counter);";
        assert_eq!(
            rename(&[("counter", "Zk2")], src),
            "var Zk2 = 0;\nvar o = { counter: 1, total: Zk2 };\nlog(o.counter);"
        );
    }

    #[test]
    fn shorthand_properties_are_expanded() {
        assert_eq!(
            rename(&[("init", "Qx7a"), ("counter", "Zk2")], "var api = { init, counter };"),
            "var api = { init: Qx7a, counter: Zk2 };"
        );
    }

    #[test]
    fn template_substitutions_are_renamed() {
        let src = "log(`count ${counter} of ${ `nested ${init()}` } counter`);";
        assert_eq!(
            rename(&[("init", "Qx7a"), ("counter", "Zk2")], src),
            "log(`count ${Zk2} of ${ `nested ${Qx7a()}` } counter`);"
        );
    }

    #[test]
    fn regex_literals_are_not_comments() {
        let src = "var re = /a\\//g; init(); var half = counter / 2; init();";
        assert_eq!(
            rename(&[("init", "Qx7a"), ("counter", "Zk2")], src),
            "var re = /a\\//g; Qx7a(); var half = Zk2 / 2; Qx7a();"
        );
    }

    #[test]
    fn class_and_object_members_keep_their_names() {
        let src = "class Widget { counter = 0; init() { return counter; } }\nvar api = { init() { init(); } };";
        assert_eq!(
            rename(&[("init", "Qx7a"), ("counter", "Zk2")], src),
            "class Widget { counter = 0; init() { return Zk2; } }\nvar api = { init() { Qx7a(); } };"
        );
    }

    #[test]
    fn blocks_and_spreads_still_rename() {
        let src = "if (ready) { init(); }\nfunction* counter() {}\nf(...counter);";
        assert_eq!(
            rename(&[("init", "Qx7a"), ("counter", "Zk2")], src),
            "if (ready) { Qx7a(); }\nfunction* Zk2() {}\nf(...Zk2);"
        );
    }

    #[test]
    fn unterminated_literal_fails() {
        let map = globals(&[("a1b", "c")]);
        let options = ScriptOptions { globals: &map, source: None };
        assert!(GlobalRenamingObfuscator.obfuscate("var s = 'open;\n", &options).is_err());
        assert!(GlobalRenamingObfuscator.obfuscate("var s = `${a1b", &options).is_err());
    }
}
