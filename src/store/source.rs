//! Read-only access to the source (WordPress) store.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;

use crate::entity::TermKind;

/// One row of the source users table.
#[derive(Debug, Clone)]
pub struct SourceUser {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub url: String,
    pub display_name: String,
    pub registered: String,
}

/// One row of the source terms join (term + taxonomy assignment).
#[derive(Debug, Clone)]
pub struct SourceTerm {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub parent: i64,
}

/// One row of the source content table (posts and pages).
#[derive(Debug, Clone)]
pub struct SourceContent {
    pub id: i64,
    pub author: i64,
    pub date: String,
    pub modified: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub status: String,
    pub password: String,
    pub slug: String,
    pub menu_order: i64,
    pub comment_status: String,
    pub ping_status: String,
    pub comment_count: i64,
}

/// One row of the source comments table.
#[derive(Debug, Clone)]
pub struct SourceComment {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub email: String,
    pub url: String,
    pub ip: String,
    pub agent: String,
    pub date: String,
    pub content: String,
    pub user_id: i64,
    pub parent: i64,
}

/// Read-only connection to the source store.
pub struct SourceStore {
    conn: Connection,
    prefix: String,
}

impl SourceStore {
    /// Open the source store read-only. A connection failure here is fatal
    /// to the whole run.
    pub fn open(path: &Path, prefix: &str) -> Result<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("failed to open source store at {}", path.display()))?;
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    /// Open an already-established connection (tests).
    #[cfg(test)]
    pub fn from_connection(conn: Connection, prefix: &str) -> Self {
        Self {
            conn,
            prefix: prefix.to_string(),
        }
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Every source user.
    pub fn users(&self) -> Result<Vec<SourceUser>> {
        let sql = format!(
            "SELECT ID, user_login, user_email, user_url, display_name, user_registered \
             FROM {} ORDER BY ID",
            self.table("users")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok(SourceUser {
                id: row.get(0)?,
                login: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                email: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                url: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                display_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                registered: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Source terms of one kind.
    ///
    /// Categories come back ordered `(parent, term_id)` so a parent is
    /// iterated before its children — the single-pass parent linkage in the
    /// orchestrator depends on this ordering.
    pub fn terms(&self, kind: TermKind) -> Result<Vec<SourceTerm>> {
        let order = match kind {
            TermKind::Category => " ORDER BY tt.parent, t.term_id",
            TermKind::Tag => " ORDER BY t.term_id",
        };
        let sql = format!(
            "SELECT t.term_id, t.name, t.slug, tt.description, tt.parent \
             FROM {terms} t \
             INNER JOIN {taxonomy} tt ON t.term_id = tt.term_id \
             WHERE tt.taxonomy = ?1{order}",
            terms = self.table("terms"),
            taxonomy = self.table("term_taxonomy"),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![kind.taxonomy()], |row| {
            Ok(SourceTerm {
                id: row.get(0)?,
                name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                slug: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                parent: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Source content items of one `post_type`, optionally published-only.
    pub fn contents(&self, post_type: &str, only_published: bool) -> Result<Vec<SourceContent>> {
        let status_condition = if only_published {
            " AND post_status = 'publish'"
        } else {
            ""
        };
        let sql = format!(
            "SELECT ID, post_author, post_date, post_modified, post_title, post_content, \
             post_excerpt, post_status, post_password, post_name, menu_order, \
             comment_status, ping_status, comment_count \
             FROM {} WHERE post_type = ?1{} ORDER BY ID",
            self.table("posts"),
            status_condition
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![post_type], |row| {
            Ok(SourceContent {
                id: row.get(0)?,
                author: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                date: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                modified: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                title: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                content: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                excerpt: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                status: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                password: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
                slug: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                menu_order: row.get::<_, Option<i64>>(10)?.unwrap_or(0),
                comment_status: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
                ping_status: row.get::<_, Option<String>>(12)?.unwrap_or_default(),
                comment_count: row.get::<_, Option<i64>>(13)?.unwrap_or(0),
            })
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Term ids (categories and tags) associated with one content item.
    pub fn term_ids_for(&self, content_id: i64) -> Result<Vec<i64>> {
        let sql = format!(
            "SELECT tt.term_id \
             FROM {rel} tr \
             INNER JOIN {taxonomy} tt ON tr.term_taxonomy_id = tt.term_taxonomy_id \
             WHERE tr.object_id = ?1 AND tt.taxonomy IN ('category', 'post_tag')",
            rel = self.table("term_relationships"),
            taxonomy = self.table("term_taxonomy"),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![content_id], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Every approved comment, in id order.
    pub fn approved_comments(&self) -> Result<Vec<SourceComment>> {
        let sql = format!(
            "SELECT comment_ID, comment_post_ID, comment_author, comment_author_email, \
             comment_author_url, comment_author_IP, comment_agent, comment_date, \
             comment_content, user_id, comment_parent \
             FROM {} WHERE comment_approved = '1' ORDER BY comment_ID",
            self.table("comments")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::comment_from_row)?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    /// Look up one source comment by id (parent resolution).
    pub fn comment_by_id(&self, id: i64) -> Result<Option<SourceComment>> {
        use rusqlite::OptionalExtension;
        let sql = format!(
            "SELECT comment_ID, comment_post_ID, comment_author, comment_author_email, \
             comment_author_url, comment_author_IP, comment_agent, comment_date, \
             comment_content, user_id, comment_parent \
             FROM {} WHERE comment_ID = ?1",
            self.table("comments")
        );
        self.conn
            .query_row(&sql, params![id], Self::comment_from_row)
            .optional()
            .map_err(Into::into)
    }

    fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SourceComment> {
        Ok(SourceComment {
            id: row.get(0)?,
            post_id: row.get(1)?,
            author: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            email: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            url: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            ip: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            agent: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            date: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            content: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            user_id: row.get::<_, Option<i64>>(9)?.unwrap_or(0),
            parent: row.get::<_, Option<i64>>(10)?.unwrap_or(0),
        })
    }

    // ------------------------------------------------------------------
    // Dry-run counts
    // ------------------------------------------------------------------

    pub fn count_users(&self) -> Result<i64> {
        self.count(&format!("SELECT COUNT(*) FROM {}", self.table("users")))
    }

    pub fn count_terms(&self, kind: TermKind) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE taxonomy = '{}'",
            self.table("term_taxonomy"),
            kind.taxonomy()
        );
        self.count(&sql)
    }

    pub fn count_contents(&self, post_type: &str, only_published: bool) -> Result<i64> {
        let status_condition = if only_published {
            " AND post_status = 'publish'"
        } else {
            ""
        };
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE post_type = '{}'{}",
            self.table("posts"),
            post_type,
            status_condition
        );
        self.count(&sql)
    }

    pub fn count_approved_comments(&self) -> Result<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE comment_approved = '1'",
            self.table("comments")
        );
        self.count(&sql)
    }

    fn count(&self, sql: &str) -> Result<i64> {
        self.conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(Into::into)
    }
}
