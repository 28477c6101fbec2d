//! Markup stripping and HTML escaping for untrusted request input

use serde_json::{Map, Value};

/// Elements whose content is dropped together with the tags
const STRIPPED_BODY_TAGS: &[&str] = &["script", "style"];

/// Recursive sanitizer for request bodies and query strings
///
/// Every string leaf loses its markup, is HTML-escaped and trimmed. Numbers,
/// booleans and nulls are returned untouched, and the shape of the input is
/// preserved. Sanitizing already sanitized input is a no-op: entity
/// references that are already in place are not escaped a second time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sanitizer;

impl Sanitizer {
    /// Sanitize any JSON value
    pub fn sanitize_value(value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(Self::sanitize_text(&s)),
            Value::Array(items) => Value::Array(items.into_iter().map(Self::sanitize_value).collect()),
            Value::Object(map) => Value::Object(Self::sanitize_map(map)),
            other => other,
        }
    }

    /// Sanitize every value of a mapping, keeping its keys
    pub fn sanitize_map(map: Map<String, Value>) -> Map<String, Value> {
        map.into_iter()
            .map(|(key, value)| (key, Self::sanitize_value(value)))
            .collect()
    }

    /// Sanitize a single string
    pub fn sanitize_text(text: &str) -> String {
        escape_html(&strip_tags(text)).trim().to_string()
    }
}

/// Remove HTML tags, comments and the bodies of script-like elements.
///
/// A `<` only opens a tag when followed by a letter, `/`, `!` or `?` and
/// closed by a later `>`. Anything else stays as text and is escaped later.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        if !opens_tag(candidate) {
            out.push('<');
            rest = &candidate[1..];
            continue;
        }

        if let Some(body) = candidate.strip_prefix("<!--") {
            rest = match body.find("-->") {
                Some(end) => &body[end + 3..],
                None => "",
            };
            continue;
        }

        let Some(end) = candidate.find('>') else {
            // unterminated tag: drop it and everything after it
            rest = "";
            break;
        };

        let tag = &candidate[1..end];
        rest = &candidate[end + 1..];

        if let Some(name) = body_stripped_tag(tag) {
            rest = skip_past_closing(rest, name);
        }
    }

    out.push_str(rest);
    out
}

fn opens_tag(candidate: &str) -> bool {
    matches!(
        candidate[1..].chars().next(),
        Some(c) if c.is_ascii_alphabetic() || c == '/' || c == '!' || c == '?'
    )
}

/// Name of the element if `tag` opens one whose body must be dropped
fn body_stripped_tag(tag: &str) -> Option<&'static str> {
    if tag.starts_with('/') {
        return None;
    }
    let name: String = tag
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    STRIPPED_BODY_TAGS.iter().copied().find(|t| *t == name)
}

/// Skip to just after `</name ...>`, or to the end when it never closes
fn skip_past_closing<'a>(rest: &'a str, name: &str) -> &'a str {
    let lower = rest.to_ascii_lowercase();
    let needle = format!("</{}", name);
    match lower.find(&needle) {
        Some(pos) => match rest[pos..].find('>') {
            Some(end) => &rest[pos + end + 1..],
            None => "",
        },
        None => "",
    }
}

/// Escape HTML-significant characters, leaving entity references intact
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for (idx, c) in input.char_indices() {
        match c {
            '&' if is_entity_reference(&input[idx..]) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whether `s` starts with `&name;`, `&#digits;` or `&#xhex;`
fn is_entity_reference(s: &str) -> bool {
    let Some(body) = s.strip_prefix('&') else {
        return false;
    };
    let Some(end) = body.find(';') else {
        return false;
    };
    let name = &body[..end];
    if name.is_empty() || name.len() > 32 {
        return false;
    }

    if let Some(num) = name.strip_prefix('#') {
        if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
            return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
        }
        return !num.is_empty() && num.chars().all(|c| c.is_ascii_digit());
    }

    name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_script_body_is_removed() {
        assert_eq!(
            Sanitizer::sanitize_text("<script>alert(\"xss\")</script>João"),
            "João"
        );
        assert_eq!(
            Sanitizer::sanitize_text("<SCRIPT type=\"text/javascript\">x()</SCRIPT> Maria"),
            "Maria"
        );
    }

    #[test]
    fn test_tags_are_stripped_text_kept() {
        assert_eq!(Sanitizer::sanitize_text("<b>Ana</b> <i>Paula</i>"), "Ana Paula");
        assert_eq!(Sanitizer::sanitize_text("<img src=x onerror=alert(1)>"), "");
        assert_eq!(Sanitizer::sanitize_text("a<!-- hidden -->b"), "ab");
    }

    #[test]
    fn test_unclosed_script_drops_remainder() {
        assert_eq!(Sanitizer::sanitize_text("Ana<script>steal()"), "Ana");
    }

    #[test]
    fn test_stray_angle_brackets_are_escaped() {
        assert_eq!(Sanitizer::sanitize_text("1 < 2 > 0"), "1 &lt; 2 &gt; 0");
        assert_eq!(Sanitizer::sanitize_text("<3 you"), "&lt;3 you");
    }

    #[test]
    fn test_escaping_and_trim() {
        assert_eq!(
            Sanitizer::sanitize_text("  Tom & Jerry's \"show\" a/b  "),
            "Tom &amp; Jerry&#x27;s &quot;show&quot; a&#x2F;b"
        );
    }

    #[test]
    fn test_accents_untouched() {
        assert_eq!(Sanitizer::sanitize_text("Higienização de Colchões"), "Higienização de Colchões");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "Tom & Jerry",
            "<b>bold</b> & 'quoted' \"double\"",
            "a/b\\c`d",
            "&amp; &#39; &#x2F; already",
            "  padded  ",
        ];
        for input in inputs {
            let once = Sanitizer::sanitize_text(input);
            let twice = Sanitizer::sanitize_text(&once);
            assert_eq!(once, twice, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_entity_reference_detection() {
        assert!(is_entity_reference("&amp;"));
        assert!(is_entity_reference("&#39;"));
        assert!(is_entity_reference("&#x2F; tail"));
        assert!(!is_entity_reference("& amp;"));
        assert!(!is_entity_reference("&#;"));
        assert!(!is_entity_reference("&no-end"));
    }

    #[test]
    fn test_nested_structures() {
        let input = json!({
            "nome": " <b>João</b> ",
            "idade": 42,
            "ativo": true,
            "vazio": null,
            "tags": ["<i>a</i>", 1, {"x": "<p>y</p>"}],
            "extra": {"nota": "<script>x</script>ok", "n": 1.5}
        });

        let out = Sanitizer::sanitize_value(input);
        assert_eq!(
            out,
            json!({
                "nome": "João",
                "idade": 42,
                "ativo": true,
                "vazio": null,
                "tags": ["a", 1, {"x": "y"}],
                "extra": {"nota": "ok", "n": 1.5}
            })
        );
    }
}
