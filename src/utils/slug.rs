//! URL slug cleanup.

use regex::Regex;
use std::sync::LazyLock;

static NON_SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\-]").unwrap());
static DASH_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-+").unwrap());

/// Normalize a slug: every non-word character becomes a hyphen, hyphen runs
/// collapse, leading/trailing hyphens are trimmed.
pub fn clean_slug(slug: &str) -> String {
    if slug.is_empty() {
        return String::new();
    }
    let s = NON_SLUG_RE.replace_all(slug, "-");
    let s = DASH_RUN_RE.replace_all(&s, "-");
    s.trim_matches('-').to_string()
}
