//! Markup context checks for keyword occurrences.

use std::sync::OnceLock;

use regex::Regex;

fn script_or_style_open() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)<(?:script|style)[^>]*>").expect("tag pattern is valid"))
}

/// Whether the bytes `offset..offset + length` of `content` sit inside a tag.
///
/// The nearest `<` before the match must be unclosed and followed by a `>`
/// after it. Inside such a tag, an odd number of quotes before the match means
/// it is in an attribute value. `<script>` and `<style>` opening tags do not
/// count as tags.
#[must_use]
pub fn is_inside_tag(content: &str, offset: usize, length: usize) -> bool {
    let before = &content[..offset];
    let Some(open) = before.rfind('<') else {
        return false;
    };
    if before.rfind('>').is_some_and(|close| close > open) {
        return false;
    }
    let after = offset + length;
    let Some(tag_end) = content[after..].find('>').map(|i| after + i) else {
        return false;
    };

    let lead = &content[open..offset];
    if lead.matches('"').count() % 2 == 1 || lead.matches('\'').count() % 2 == 1 {
        return true;
    }
    !script_or_style_open().is_match(&content[open..=tag_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(content: &str, needle: &str) -> bool {
        let offset = content.find(needle).unwrap();
        is_inside_tag(content, offset, needle.len())
    }

    #[test]
    fn text_between_tags_is_outside() {
        assert!(!check("<p>secret</p>", "secret"));
        assert!(!check("secret at start", "secret"));
    }

    #[test]
    fn attribute_values_are_inside() {
        assert!(check(r#"<a title="secret">x</a>"#, "secret"));
        assert!(check("<a title='the secret'>x</a>", "secret"));
    }

    #[test]
    fn tag_names_and_bare_attributes_are_inside() {
        assert!(check("<secret-element>x</secret-element>", "secret"));
        assert!(check("<input secret>", "secret"));
    }

    #[test]
    fn script_and_style_opening_tags_are_exempt() {
        assert!(!check("<script data-secret>x</script>", "secret"));
        assert!(!check("<style secret>x</style>", "secret"));
    }

    #[test]
    fn unterminated_tag_is_outside() {
        assert!(!check("<p secret", "secret"));
    }
}
