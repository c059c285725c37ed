//! HTML text utilities: entity decoding and tag stripping.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Remove every HTML tag, keeping the text content.
pub fn strip_tags(s: &str) -> Cow<'_, str> {
    TAG_RE.replace_all(s, "")
}

/// Unescape HTML entities back to characters.
///
/// Handles common named entities and numeric character references.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '&' {
            result.push(c);
            continue;
        }

        // Collect entity
        let mut entity = String::new();
        for c in chars.by_ref() {
            if c == ';' {
                break;
            }
            entity.push(c);
            if entity.len() > 10 {
                // Too long, not a valid entity
                result.push('&');
                result.push_str(&entity);
                entity.clear();
                break;
            }
        }

        if entity.is_empty() {
            result.push('&');
            continue;
        }

        // Decode entity
        match entity.as_str() {
            "lt" => result.push('<'),
            "gt" => result.push('>'),
            "amp" => result.push('&'),
            "quot" => result.push('"'),
            "apos" => result.push('\''),
            "nbsp" => result.push('\u{00A0}'),
            s if s.starts_with('#') => {
                let code = if s.starts_with("#x") || s.starts_with("#X") {
                    u32::from_str_radix(&s[2..], 16).ok()
                } else {
                    s[1..].parse().ok()
                };
                if let Some(c) = code.and_then(char::from_u32) {
                    result.push(c);
                } else {
                    result.push('&');
                    result.push_str(&entity);
                    result.push(';');
                }
            }
            _ => {
                result.push('&');
                result.push_str(&entity);
                result.push(';');
            }
        }
    }

    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_named() {
        assert_eq!(unescape("&lt;div&gt; &amp; &quot;x&quot;"), "<div> & \"x\"");
    }

    #[test]
    fn test_unescape_numeric() {
        assert_eq!(unescape("&#65;&#x42;"), "AB");
    }

    #[test]
    fn test_unescape_passthrough() {
        assert!(matches!(unescape("no entities here"), Cow::Borrowed(_)));
        assert_eq!(unescape("a && b"), "a && b");
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<em>hello</em> <a href=\"x\">world</a>"), "hello world");
        assert_eq!(strip_tags("plain"), "plain");
    }
}
