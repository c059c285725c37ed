//! SQL insert-script generation from a parsed WXR export.
//!
//! The script targets a fresh MySQL Typecho schema: ids are assigned
//! sequentially from 1 per kind, so it must not be replayed into a store
//! that already holds content.

use std::collections::HashMap;
use std::fmt;

use crate::entity::{flag_from_open, map_status};
use crate::markdown::{transpile, SENTINEL};
use crate::utils::date::timestamp_or_now;

use super::{WxrDocument, WxrItem};

/// A generated import script.
pub struct SqlScript(String);

impl SqlScript {
    pub fn generate(doc: &WxrDocument, prefix: &str) -> Self {
        let mut out = String::new();
        out.push_str("-- Typecho import script generated by wp2typecho\n");
        out.push_str("-- Run against an empty schema; ids are assigned from 1.\n");
        if !doc.title.is_empty() {
            out.push_str(&format!("-- Source: {} <{}>\n", doc.title, doc.link));
        }
        out.push_str("SET NAMES utf8mb4;\nSET FOREIGN_KEY_CHECKS = 0;\n\n");

        let term_mids = write_metas(&mut out, doc, prefix);
        write_contents(&mut out, doc, prefix);
        write_relationships(&mut out, doc, prefix, &term_mids);
        write_comments(&mut out, doc, prefix);

        out.push_str("\nSET FOREIGN_KEY_CHECKS = 1;\n");
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Emit meta rows for every channel-declared term; returns slug → mid.
fn write_metas(out: &mut String, doc: &WxrDocument, prefix: &str) -> HashMap<String, i64> {
    let mut mids = HashMap::new();
    let mut next_mid = 1i64;
    for term in doc.categories.iter().chain(doc.tags.iter()) {
        mids.entry(term.slug.clone()).or_insert_with(|| {
            let mid = next_mid;
            next_mid += 1;
            mid
        });
    }

    let usage = usage_counts(doc, &mids);
    for (kind, term) in doc
        .categories
        .iter()
        .map(|t| ("category", t))
        .chain(doc.tags.iter().map(|t| ("tag", t)))
    {
        let Some(&mid) = mids.get(&term.slug) else {
            continue;
        };
        let parent = if kind == "category" && !term.parent_slug.is_empty() {
            mids.get(&term.parent_slug).copied().unwrap_or(0)
        } else {
            0
        };
        let count = usage.get(&mid).copied().unwrap_or(0);
        out.push_str(&format!(
            "INSERT INTO `{prefix}metas` (`mid`, `name`, `slug`, `type`, `description`, `count`, `order`, `parent`) \
             VALUES ({mid}, {}, {}, '{kind}', '', {count}, 0, {parent});\n",
            quote(&term.name),
            quote(&term.slug),
        ));
    }
    out.push('\n');
    mids
}

/// How many items reference each declared term.
fn usage_counts(doc: &WxrDocument, mids: &HashMap<String, i64>) -> HashMap<i64, i64> {
    let mut counts = HashMap::new();
    for item in &doc.items {
        for slug in &item.term_slugs {
            if let Some(&mid) = mids.get(slug) {
                *counts.entry(mid).or_insert(0) += 1;
            }
        }
    }
    counts
}

fn item_text(item: &WxrItem) -> String {
    let excerpt = item.excerpt.trim();
    if excerpt.is_empty() {
        transpile(&item.content)
    } else {
        format!("{SENTINEL}\n{excerpt}\n\n<!--more-->\n\n{}", item.content)
    }
}

fn write_contents(out: &mut String, doc: &WxrDocument, prefix: &str) {
    for (index, item) in doc.items.iter().enumerate() {
        let cid = index as i64 + 1;
        let slug = if item.slug.is_empty() {
            format!("{}-{}", item.post_type, item.post_id)
        } else {
            item.slug.clone()
        };
        let created = timestamp_or_now(&item.date);
        let order = if item.post_type == "page" {
            item.menu_order
        } else {
            0
        };
        out.push_str(&format!(
            "INSERT INTO `{prefix}contents` (`cid`, `title`, `slug`, `created`, `modified`, \
             `text`, `order`, `authorId`, `template`, `type`, `status`, `password`, \
             `commentsNum`, `allowComment`, `allowPing`, `allowFeed`, `parent`) \
             VALUES ({cid}, {}, {}, {created}, {created}, {}, {order}, 1, NULL, '{}', '{}', {}, \
             {}, '{}', '{}', '1', 0);\n",
            quote(&item.title),
            quote(&slug),
            quote(&item_text(item)),
            item.post_type,
            map_status(&item.status),
            if item.password.is_empty() {
                "NULL".to_string()
            } else {
                quote(&item.password)
            },
            item.comments.len(),
            flag_from_open(&item.comment_status),
            flag_from_open(&item.ping_status),
        ));
    }
    out.push('\n');
}

/// Relationships only exist for slugs declared at channel level.
fn write_relationships(
    out: &mut String,
    doc: &WxrDocument,
    prefix: &str,
    mids: &HashMap<String, i64>,
) {
    for (index, item) in doc.items.iter().enumerate() {
        let cid = index as i64 + 1;
        let mut seen = Vec::new();
        for slug in &item.term_slugs {
            let Some(&mid) = mids.get(slug) else {
                continue;
            };
            if seen.contains(&mid) {
                continue;
            }
            seen.push(mid);
            out.push_str(&format!(
                "INSERT INTO `{prefix}relationships` (`cid`, `mid`) VALUES ({cid}, {mid});\n"
            ));
        }
    }
    out.push('\n');
}

fn write_comments(out: &mut String, doc: &WxrDocument, prefix: &str) {
    let mut next_coid = 1i64;
    for (index, item) in doc.items.iter().enumerate() {
        let cid = index as i64 + 1;
        // Source comment id → assigned coid, for parent threading within
        // the same item.
        let mut coids = HashMap::new();
        for comment in &item.comments {
            coids.insert(comment.id, next_coid);
            next_coid += 1;
        }
        for comment in &item.comments {
            let coid = coids[&comment.id];
            let parent = if comment.parent > 0 {
                coids.get(&comment.parent).copied().unwrap_or(0)
            } else {
                0
            };
            let status = if comment.approved {
                "approved"
            } else {
                "waiting"
            };
            out.push_str(&format!(
                "INSERT INTO `{prefix}comments` (`coid`, `cid`, `created`, `author`, `authorId`, \
                 `ownerId`, `mail`, `url`, `ip`, `agent`, `text`, `type`, `status`, `parent`) \
                 VALUES ({coid}, {cid}, {}, {}, 0, 1, {}, {}, {}, '', {}, 'comment', '{status}', {parent});\n",
                timestamp_or_now(&comment.date),
                quote(&comment.author),
                quote(&comment.email),
                quote(&comment.url),
                quote(&comment.ip),
                quote(&comment.content),
            ));
        }
    }
}

/// MySQL single-quoted string literal with manual escaping.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}
