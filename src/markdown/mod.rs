//! Structural-content transpiler: Gutenberg block markup → Markdown.
//!
//! `transpile` is a pure text-to-text function. The conversion is an
//! ordered chain of rewrite rules applied left-to-right; the ordering is
//! load-bearing (code extraction runs first so the generic tag stripping
//! later in the chain cannot corrupt literal code bodies).
//!
//! Converted content is prefixed with the `<!--markdown-->` sentinel, which
//! makes a second invocation a no-op. If any rule fails, the original input
//! is returned untouched — never corrupt content.

mod rules;

use anyhow::Result;

use crate::debug;

/// Leading marker for already-converted content.
pub const SENTINEL: &str = "<!--markdown-->";

type Rule = fn(&str) -> Result<String>;

/// The rewrite chain, applied in order.
const RULES: &[(&str, Rule)] = &[
    ("code", rules::code_blocks),
    ("heading", rules::headings),
    ("list", rules::lists),
    ("quote", rules::quotes),
    ("image", rules::images),
    ("separator", rules::separators),
    ("paragraph", rules::paragraphs),
    ("inline", rules::inline_tags),
    ("whitespace", rules::whitespace),
];

/// Convert structural block markup into flat Markdown.
///
/// Returns the input unchanged when it already carries the sentinel or when
/// it contains no structural-block signature.
pub fn transpile(content: &str) -> String {
    if content.is_empty() || content.starts_with(SENTINEL) {
        return content.to_string();
    }

    let has_block_comment = content.contains("<!-- wp:");
    let has_block_class = content.contains("wp-block-");
    if !has_block_comment && !has_block_class {
        return content.to_string();
    }

    let mut text = content.to_string();
    for (name, rule) in RULES {
        match rule(&text) {
            Ok(next) => text = next,
            Err(e) => {
                debug!("convert"; "rule `{name}` failed, keeping original content: {e}");
                return content.to_string();
            }
        }
    }

    if text.starts_with(SENTINEL) {
        text
    } else {
        format!("{SENTINEL}{text}")
    }
}
