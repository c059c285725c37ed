//! Individual rewrite rules for the transpiler chain.
//!
//! Every rule takes the whole document and returns a rewritten copy. Rules
//! never touch text they do not recognize.

use anyhow::Result;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::utils::html::{strip_tags, unescape};

// ============================================================================
// Code blocks
// ============================================================================

static CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<!--\s*wp:code\s*(\{[^}]*\})?\s*-->\s*<pre[^>]*><code[^>]*>(.*?)</code></pre>\s*<!--\s*/wp:code\s*-->",
    )
    .unwrap()
});

static LANG_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"language-(\w+)").unwrap());

static LANG_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""language"\s*:\s*"([^"]+)""#).unwrap());

static LANG_CLASS_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""className"\s*:\s*"[^"]*language-([^"\s]+)"#).unwrap());

static LANG_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?://|#|--|\*)\s*language:\s*(\w+)").unwrap());

static LANG_MARKER_STRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?://|#|--|\*)\s*language:\s*\w+[ \t]*\n?").unwrap());

/// Extract fenced code blocks with language resolution.
///
/// Precedence: metadata `language` field, then a `language-X` token in the
/// metadata class name, then a `<marker> language: X` sentinel on the first
/// line of the code body (stripped from the output either way).
pub fn code_blocks(content: &str) -> Result<String> {
    let out = CODE_RE.replace_all(content, |caps: &Captures<'_>| {
        let metadata = caps.get(1).map_or("{}", |m| m.as_str());
        let mut code = unescape(&caps[2]).into_owned();
        let mut language = language_from_metadata(metadata);

        if language.is_empty() {
            let (marker_lang, cleaned) = split_language_marker(&code);
            if let Some(lang) = marker_lang {
                language = lang;
                code = cleaned;
            }
        } else {
            // A body marker is redundant once metadata named the language.
            let (_, cleaned) = split_language_marker(&code);
            if cleaned != code {
                code = cleaned;
            }
        }

        format!("```{language}\n{code}\n```")
    });
    Ok(out.into_owned())
}

/// Resolve the language from the block's JSON metadata, falling back to
/// plain pattern extraction when the metadata is not valid JSON.
fn language_from_metadata(metadata: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(metadata) {
        Ok(meta) => {
            if let Some(lang) = meta.get("language").and_then(|v| v.as_str()) {
                if !lang.is_empty() {
                    return lang.to_string();
                }
            }
            if let Some(class_name) = meta.get("className").and_then(|v| v.as_str()) {
                if let Some(caps) = LANG_CLASS_RE.captures(class_name) {
                    return caps[1].to_string();
                }
            }
            String::new()
        }
        Err(_) => {
            if let Some(caps) = LANG_FIELD_RE.captures(metadata) {
                return caps[1].to_string();
            }
            if let Some(caps) = LANG_CLASS_FIELD_RE.captures(metadata) {
                return caps[1].to_string();
            }
            String::new()
        }
    }
}

/// Detect a first-line language marker in a code body.
///
/// Returns the language (lowercased) and the body with the marker removed;
/// with no marker present the body comes back unchanged.
fn split_language_marker(code: &str) -> (Option<String>, String) {
    let trimmed = code.trim();
    if let Some(caps) = LANG_MARKER_RE.captures(trimmed) {
        let language = caps[1].to_lowercase();
        let stripped = LANG_MARKER_STRIP_RE.replace(trimmed, "");
        (Some(language), stripped.trim().to_string())
    } else {
        (None, code.to_string())
    }
}

// ============================================================================
// Headings
// ============================================================================

// The regex crate has no backreferences, so `<h(\d)>...</h\1>` becomes one
// pattern per heading level.
static WRAPPED_HEADING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    (1..=6)
        .map(|level| {
            Regex::new(&format!(
                r"(?s)<!--\s*wp:heading\s*(\{{[^}}]*\}})?\s*-->\s*<h{level}[^>]*>(.*?)</h{level}>\s*<!--\s*/wp:heading\s*-->",
            ))
            .unwrap()
        })
        .collect()
});

static BARE_HEADING_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    (1..=6)
        .map(|level| {
            Regex::new(&format!(
                r#"(?s)<h{level}[^>]*class="[^"]*wp-block-heading[^"]*"[^>]*>(.*?)</h{level}>"#,
            ))
            .unwrap()
        })
        .collect()
});

/// Headings: both comment-wrapped and bare class-marked variants.
pub fn headings(content: &str) -> Result<String> {
    let mut text = content.to_string();

    for (i, re) in WRAPPED_HEADING_RES.iter().enumerate() {
        let level = i + 1;
        text = re
            .replace_all(&text, |caps: &Captures<'_>| {
                let title = strip_tags(&caps[2]);
                format!("{} {}\n", "#".repeat(level), title)
            })
            .into_owned();
    }

    for (i, re) in BARE_HEADING_RES.iter().enumerate() {
        let level = i + 1;
        text = re
            .replace_all(&text, |caps: &Captures<'_>| {
                let title = strip_tags(&caps[1]);
                format!("\n{} {}\n", "#".repeat(level), title)
            })
            .into_owned();
    }

    Ok(text)
}

// ============================================================================
// Lists
// ============================================================================

static ORDERED_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<!--\s*wp:list\s*(\{[^}]*\})?\s*-->\s*<ol[^>]*>(.*?)</ol>\s*<!--\s*/wp:list\s*-->",
    )
    .unwrap()
});

static UNORDERED_LIST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\s*wp:list\s*-->\s*<ul[^>]*>(.*?)</ul>\s*<!--\s*/wp:list\s*-->").unwrap()
});

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<li[^>]*>(.*?)</li>").unwrap());

/// Ordered lists become `N. item` (1-based), unordered lists `- item`.
pub fn lists(content: &str) -> Result<String> {
    let text = ORDERED_LIST_RE.replace_all(content, |caps: &Captures<'_>| {
        let items: Vec<String> = LIST_ITEM_RE
            .captures_iter(&caps[2])
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, strip_tags(&item[1]).trim()))
            .collect();
        format!("{}\n", items.join("\n"))
    });

    let text = UNORDERED_LIST_RE.replace_all(&text, |caps: &Captures<'_>| {
        let items: Vec<String> = LIST_ITEM_RE
            .captures_iter(&caps[1])
            .map(|item| format!("- {}", strip_tags(&item[1]).trim()))
            .collect();
        format!("{}\n", items.join("\n"))
    });

    Ok(text.into_owned())
}

// ============================================================================
// Quotes
// ============================================================================

static QUOTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<!--\s*wp:quote\s*-->\s*<blockquote[^>]*>(.*?)</blockquote>\s*<!--\s*/wp:quote\s*-->",
    )
    .unwrap()
});

static P_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?p[^>]*>").unwrap());

/// Quotes: unwrap paragraphs, strip tags, prefix non-blank lines with `> `.
pub fn quotes(content: &str) -> Result<String> {
    let out = QUOTE_RE.replace_all(content, |caps: &Captures<'_>| {
        let inner = P_TAG_RE.replace_all(&caps[1], "");
        let inner = strip_tags(&inner);
        let quoted: Vec<String> = inner
            .trim()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| format!("> {line}"))
            .collect();
        format!("{}\n", quoted.join("\n"))
    });
    Ok(out.into_owned())
}

// ============================================================================
// Images
// ============================================================================

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--\s*wp:image[^>]*-->\s*<figure[^>]*>.*?<img[^>]*src="([^"]+)"[^>]*alt="([^"]*)"[^>]*>.*?</figure>\s*<!--\s*/wp:image\s*-->"#,
    )
    .unwrap()
});

/// Figure/image blocks become `![alt](src)`.
pub fn images(content: &str) -> Result<String> {
    let out = IMAGE_RE.replace_all(content, "![${2}](${1})\n");
    Ok(out.into_owned())
}

// ============================================================================
// Separators
// ============================================================================

static SEPARATOR_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?s)<!--\s*wp:separator[^>]*-->\s*<hr[^>]*/?>\s*<!--\s*/wp:separator\s*-->",
        r#"<hr\s+class="wp-block-separator[^"]*"[^>]*/>"#,
        r#"<hr\s+class="wp-block-separator[^"]*"[^>]*>"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Every legacy separator representation normalizes to a single `---` line.
pub fn separators(content: &str) -> Result<String> {
    let mut text = content.to_string();
    for re in SEPARATOR_RES.iter() {
        text = re.replace_all(&text, "\n---\n").into_owned();
    }
    Ok(text)
}

// ============================================================================
// Paragraph markers
// ============================================================================

static PARA_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*wp:paragraph\s*-->\s*").unwrap());

static PARA_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*<!--\s*/wp:paragraph\s*-->").unwrap());

/// Paragraph comment wrappers are removed without altering the content.
pub fn paragraphs(content: &str) -> Result<String> {
    let text = PARA_OPEN_RE.replace_all(content, "");
    let text = PARA_CLOSE_RE.replace_all(&text, "");
    Ok(text.into_owned())
}

// ============================================================================
// Residual inline and legacy tags
// ============================================================================

static STRONG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<strong>(.*?)</strong>").unwrap());
static B_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<b>(.*?)</b>").unwrap());
static EM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<em>(.*?)</em>").unwrap());
static I_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<i>(.*?)</i>").unwrap());
static INLINE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<code>(.*?)</code>").unwrap());
static MARK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<mark[^>]*>(.*?)</mark>").unwrap());
static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a[^>]*href="([^"]+)"[^>]*>(.*?)</a>"#).unwrap());
static P_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<p[^>]*>").unwrap());
static P_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</p>").unwrap());
static WP_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*/?wp:[^>]*-->").unwrap());

/// Inline conversions plus removal of leftover structural comments.
pub fn inline_tags(content: &str) -> Result<String> {
    let text = STRONG_RE.replace_all(content, "**${1}**");
    let text = B_RE.replace_all(&text, "**${1}**");
    let text = EM_RE.replace_all(&text, "*${1}*");
    let text = I_RE.replace_all(&text, "*${1}*");
    let text = INLINE_CODE_RE.replace_all(&text, "`${1}`");
    let text = MARK_RE.replace_all(&text, "**${1}**");
    let text = LINK_RE.replace_all(&text, "[${2}](${1})");
    let text = P_OPEN_RE.replace_all(&text, "\n");
    let text = P_CLOSE_RE.replace_all(&text, "\n");
    let text = WP_COMMENT_RE.replace_all(&text, "");
    Ok(text.into_owned())
}

// ============================================================================
// Whitespace normalization
// ============================================================================

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Collapse runs of blank lines and trim the result.
pub fn whitespace(content: &str) -> Result<String> {
    let text = BLANK_RUN_RE.replace_all(content, "\n\n");
    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_valid_metadata() {
        assert_eq!(language_from_metadata(r#"{"language":"bash"}"#), "bash");
        assert_eq!(
            language_from_metadata(r#"{"className":"language-rust wp-block-code"}"#),
            "rust"
        );
        assert_eq!(language_from_metadata("{}"), "");
    }

    #[test]
    fn test_language_from_broken_metadata() {
        // Unbalanced JSON still yields a language via pattern fallback.
        assert_eq!(language_from_metadata(r#"{"language":"go"#), "go");
    }

    #[test]
    fn test_split_language_marker_variants() {
        for (body, lang) in [
            ("// language: php\ncode", "php"),
            ("# language: Python\ncode", "python"),
            ("-- language: sql\ncode", "sql"),
            ("* language: c\ncode", "c"),
        ] {
            let (found, rest) = split_language_marker(body);
            assert_eq!(found.as_deref(), Some(lang));
            assert_eq!(rest, "code");
        }
    }

    #[test]
    fn test_split_language_marker_absent() {
        let (found, rest) = split_language_marker("plain body");
        assert!(found.is_none());
        assert_eq!(rest, "plain body");
    }

    #[test]
    fn test_quote_drops_blank_lines() {
        let input = "<!-- wp:quote --><blockquote><p>a</p>\n\n<p>b</p></blockquote><!-- /wp:quote -->";
        let out = quotes(input).unwrap();
        assert_eq!(out, "> a\n> b\n");
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(whitespace("a\n\n\n\n\nb").unwrap(), "a\n\nb");
        assert_eq!(whitespace("  padded  ").unwrap(), "padded");
    }

    #[test]
    fn test_mark_converts_across_lines() {
        let out = inline_tags("<mark class=\"hl\">two\nlines</mark>").unwrap();
        assert_eq!(out, "**two\nlines**");
    }

    #[test]
    fn test_strong_does_not_span_lines() {
        // Single-line tags only; multi-line bold is left for tag stripping.
        let out = inline_tags("<strong>two\nlines</strong>").unwrap();
        assert_eq!(out, "<strong>two\nlines</strong>");
    }
}
