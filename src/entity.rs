//! Shared entity vocabulary for both migration paths.

use std::fmt;

/// Term kind in the target store's unified term table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Category,
    Tag,
}

impl TermKind {
    /// Column value in the target `metas` table.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "tag",
        }
    }

    /// Taxonomy name in the source taxonomy-assignment table.
    pub const fn taxonomy(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Tag => "post_tag",
        }
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content kind in the target store's unified content table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Post,
    Page,
}

impl ContentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Page => "page",
        }
    }

    /// Fallback slug prefix when the source item has no usable slug.
    pub const fn slug_prefix(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a source content status onto the target vocabulary.
///
/// `pending` becomes `waiting`; anything unrecognized is demoted to `draft`.
pub fn map_status(source: &str) -> &'static str {
    match source {
        "publish" => "publish",
        "draft" => "draft",
        "private" => "private",
        "pending" => "waiting",
        _ => "draft",
    }
}

/// `open`/`closed` flags become `'1'`/`'0'` text columns in the target.
pub fn flag_from_open(status: &str) -> &'static str {
    if status == "open" {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping_table() {
        assert_eq!(map_status("publish"), "publish");
        assert_eq!(map_status("draft"), "draft");
        assert_eq!(map_status("private"), "private");
        assert_eq!(map_status("pending"), "waiting");
        assert_eq!(map_status("trash"), "draft");
        assert_eq!(map_status(""), "draft");
    }

    #[test]
    fn test_open_flag() {
        assert_eq!(flag_from_open("open"), "1");
        assert_eq!(flag_from_open("closed"), "0");
    }

    #[test]
    fn test_term_kind_taxonomy() {
        assert_eq!(TermKind::Category.taxonomy(), "category");
        assert_eq!(TermKind::Tag.taxonomy(), "post_tag");
    }
}
