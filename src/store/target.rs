//! Read-write access to the target (Typecho) store.
//!
//! All dedup lookups here use natural keys (login/mail, `(type, slug)`,
//! attachment storage path) so that a restarted run can rediscover
//! previously migrated rows without any persisted identity map.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Parameters for a new user row.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub password_hash: &'a str,
    pub mail: &'a str,
    pub url: &'a str,
    pub screen_name: &'a str,
    pub created: i64,
}

/// Parameters for a new content row (post, page or attachment).
#[derive(Debug, Clone)]
pub struct NewContent<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub created: i64,
    pub modified: i64,
    pub text: &'a str,
    pub order: i64,
    pub author_id: i64,
    pub template: Option<&'a str>,
    pub kind: &'a str,
    pub status: &'a str,
    pub password: Option<&'a str>,
    pub comments_num: i64,
    pub allow_comment: &'a str,
    pub allow_ping: &'a str,
    pub allow_feed: &'a str,
    pub parent: i64,
}

/// Parameters for a new comment row.
#[derive(Debug, Clone)]
pub struct NewComment<'a> {
    pub cid: i64,
    pub created: i64,
    pub author: &'a str,
    pub author_id: i64,
    pub owner_id: i64,
    pub mail: &'a str,
    pub url: &'a str,
    pub ip: &'a str,
    pub agent: &'a str,
    pub text: &'a str,
    pub status: &'a str,
    pub parent: i64,
}

/// Read-write connection to the target store.
pub struct TargetStore {
    conn: Connection,
    prefix: String,
}

impl TargetStore {
    /// Open the target store. A connection failure here is fatal to the
    /// whole run.
    pub fn open(path: &Path, prefix: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open target store at {}", path.display()))?;
        Ok(Self {
            conn,
            prefix: prefix.to_string(),
        })
    }

    fn table(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    // ------------------------------------------------------------------
    // Batch commit discipline
    // ------------------------------------------------------------------

    /// Open a phase transaction.
    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    /// Commit the running batch and immediately open the next one.
    pub fn checkpoint(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT; BEGIN")?;
        Ok(())
    }

    /// Commit at the end of a phase.
    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Natural-key dedup: a user exists when either login or mail matches.
    pub fn find_user(&self, login: &str, mail: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT uid FROM {} WHERE name = ?1 OR mail = ?2",
            self.table("users")
        );
        self.conn
            .query_row(&sql, params![login, mail], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    pub fn insert_user(&self, user: &NewUser<'_>) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {} \
             (name, password, mail, url, screenName, created, activated, logged, \"group\", authCode) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            self.table("users")
        );
        self.conn.execute(
            &sql,
            params![
                user.name,
                user.password_hash,
                user.mail,
                user.url,
                user.screen_name,
                user.created,
                user.created,
                user.created,
                "administrator",
                "",
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Terms (metas)
    // ------------------------------------------------------------------

    /// Natural-key dedup on `(type, slug)`.
    pub fn find_meta(&self, kind: &str, slug: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT mid FROM {} WHERE type = ?1 AND slug = ?2",
            self.table("metas")
        );
        self.conn
            .query_row(&sql, params![kind, slug], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    pub fn insert_meta(
        &self,
        name: &str,
        slug: &str,
        kind: &str,
        description: &str,
        parent: i64,
    ) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {} (name, slug, type, description, count, \"order\", parent) \
             VALUES (?1, ?2, ?3, ?4, 0, 0, ?5)",
            self.table("metas")
        );
        self.conn
            .execute(&sql, params![name, slug, kind, description, parent])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Per-term usage counter, bumped once per newly inserted relationship.
    pub fn bump_meta_count(&self, mid: i64) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET count = count + 1 WHERE mid = ?1",
            self.table("metas")
        );
        self.conn.execute(&sql, params![mid])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Contents
    // ------------------------------------------------------------------

    /// Natural-key dedup on `(slug, type)`.
    pub fn find_content(&self, slug: &str, kind: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT cid FROM {} WHERE slug = ?1 AND type = ?2",
            self.table("contents")
        );
        self.conn
            .query_row(&sql, params![slug, kind], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    pub fn insert_content(&self, content: &NewContent<'_>) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {} \
             (title, slug, created, modified, text, \"order\", authorId, template, \
             type, status, password, commentsNum, allowComment, allowPing, allowFeed, parent) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            self.table("contents")
        );
        self.conn.execute(
            &sql,
            params![
                content.title,
                content.slug,
                content.created,
                content.modified,
                content.text,
                content.order,
                content.author_id,
                content.template,
                content.kind,
                content.status,
                content.password,
                content.comments_num,
                content.allow_comment,
                content.allow_ping,
                content.allow_feed,
                content.parent,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_content_text(&self, cid: i64, text: &str) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET text = ?1 WHERE cid = ?2",
            self.table("contents")
        );
        self.conn.execute(&sql, params![text, cid])?;
        Ok(())
    }

    /// Per-content comment counter.
    pub fn bump_comments_num(&self, cid: i64) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET commentsNum = commentsNum + 1 WHERE cid = ?1",
            self.table("contents")
        );
        self.conn.execute(&sql, params![cid])?;
        Ok(())
    }

    /// Posts whose body still carries structural block markup.
    pub fn contents_with_block_markup(&self) -> Result<Vec<(i64, String, String)>> {
        let sql = format!(
            "SELECT cid, title, text FROM {} \
             WHERE type = 'post' AND (text LIKE '%<!-- wp:%' OR text LIKE '%wp-block-%') \
             ORDER BY cid",
            self.table("contents")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get(0)?,
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            ))
        })?;
        rows.collect::<rusqlite::Result<_>>().map_err(Into::into)
    }

    pub fn content_by_id(&self, cid: i64) -> Result<Option<(i64, String, String)>> {
        let sql = format!(
            "SELECT cid, title, text FROM {} WHERE cid = ?1",
            self.table("contents")
        );
        self.conn
            .query_row(&sql, params![cid], |row| {
                Ok((
                    row.get(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                ))
            })
            .optional()
            .map_err(Into::into)
    }

    /// Attachment dedup on the exact resolved storage path embedded in the
    /// descriptor payload. Collision-suffixed filenames keep paths unique.
    pub fn find_attachment_by_path(&self, path: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT cid FROM {} WHERE type = 'attachment' AND text LIKE ?1",
            self.table("contents")
        );
        let pattern = format!("%\"path\":\"{path}\"%");
        self.conn
            .query_row(&sql, params![pattern], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Relationships
    // ------------------------------------------------------------------

    pub fn relationship_exists(&self, cid: i64, mid: i64) -> Result<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE cid = ?1 AND mid = ?2",
            self.table("relationships")
        );
        Ok(self
            .conn
            .query_row(&sql, params![cid, mid], |_| Ok(()))
            .optional()?
            .is_some())
    }

    pub fn insert_relationship(&self, cid: i64, mid: i64) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (cid, mid) VALUES (?1, ?2)",
            self.table("relationships")
        );
        self.conn.execute(&sql, params![cid, mid])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    pub fn insert_comment(&self, comment: &NewComment<'_>) -> Result<i64> {
        let sql = format!(
            "INSERT INTO {} \
             (cid, created, author, authorId, ownerId, mail, url, ip, agent, \
             text, type, status, parent) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 'comment', ?11, ?12)",
            self.table("comments")
        );
        self.conn.execute(
            &sql,
            params![
                comment.cid,
                comment.created,
                comment.author,
                comment.author_id,
                comment.owner_id,
                comment.mail,
                comment.url,
                comment.ip,
                comment.agent,
                comment.text,
                comment.status,
                comment.parent,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Heuristic parent lookup: first migrated comment whose body contains
    /// the given text fragment.
    pub fn find_comment_containing(&self, fragment: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT coid FROM {} WHERE text LIKE ?1 LIMIT 1",
            self.table("comments")
        );
        let pattern = format!("%{fragment}%");
        self.conn
            .query_row(&sql, params![pattern], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Dry-run counts
    // ------------------------------------------------------------------

    pub fn count_users(&self) -> Result<i64> {
        self.count(&format!("SELECT COUNT(*) FROM {}", self.table("users")))
    }

    pub fn count_metas(&self, kind: &str) -> Result<i64> {
        self.count(&format!(
            "SELECT COUNT(*) FROM {} WHERE type = '{kind}'",
            self.table("metas")
        ))
    }

    pub fn count_contents(&self, kind: &str) -> Result<i64> {
        self.count(&format!(
            "SELECT COUNT(*) FROM {} WHERE type = '{kind}'",
            self.table("contents")
        ))
    }

    pub fn count_relationships(&self) -> Result<i64> {
        self.count(&format!(
            "SELECT COUNT(*) FROM {}",
            self.table("relationships")
        ))
    }

    pub fn count_comments(&self) -> Result<i64> {
        self.count(&format!("SELECT COUNT(*) FROM {}", self.table("comments")))
    }

    fn count(&self, sql: &str) -> Result<i64> {
        self.conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(Into::into)
    }

    // ------------------------------------------------------------------
    // Test support
    // ------------------------------------------------------------------

    /// Create an empty target schema (tests only).
    #[cfg(test)]
    pub fn create_schema(&self) -> Result<()> {
        let p = &self.prefix;
        self.conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {p}users (
                uid INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT, password TEXT, mail TEXT, url TEXT, screenName TEXT,
                created INTEGER, activated INTEGER, logged INTEGER,
                "group" TEXT, authCode TEXT
            );
            CREATE TABLE IF NOT EXISTS {p}metas (
                mid INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT, slug TEXT, type TEXT, description TEXT,
                count INTEGER DEFAULT 0, "order" INTEGER DEFAULT 0,
                parent INTEGER DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS {p}contents (
                cid INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT, slug TEXT, created INTEGER, modified INTEGER,
                text TEXT, "order" INTEGER DEFAULT 0, authorId INTEGER,
                template TEXT, type TEXT, status TEXT, password TEXT,
                commentsNum INTEGER DEFAULT 0, allowComment TEXT,
                allowPing TEXT, allowFeed TEXT, parent INTEGER DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS {p}relationships (
                cid INTEGER, mid INTEGER
            );
            CREATE TABLE IF NOT EXISTS {p}comments (
                coid INTEGER PRIMARY KEY AUTOINCREMENT,
                cid INTEGER, created INTEGER, author TEXT, authorId INTEGER,
                ownerId INTEGER, mail TEXT, url TEXT, ip TEXT, agent TEXT,
                text TEXT, type TEXT, status TEXT, parent INTEGER DEFAULT 0
            );
            "#
        ))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_store() -> TargetStore {
        let store = TargetStore {
            conn: Connection::open_in_memory().unwrap(),
            prefix: "typecho_".into(),
        };
        store.create_schema().unwrap();
        store
    }

    fn sample_content<'a>(slug: &'a str, kind: &'a str) -> NewContent<'a> {
        NewContent {
            title: "Title",
            slug,
            created: 1_700_000_000,
            modified: 1_700_000_000,
            text: "body",
            order: 0,
            author_id: 1,
            template: None,
            kind,
            status: "publish",
            password: None,
            comments_num: 0,
            allow_comment: "1",
            allow_ping: "1",
            allow_feed: "1",
            parent: 0,
        }
    }

    #[test]
    fn test_user_dedup_by_login_or_mail() {
        let store = memory_store();
        let uid = store
            .insert_user(&NewUser {
                name: "alice",
                password_hash: "x",
                mail: "alice@example.com",
                url: "",
                screen_name: "Alice",
                created: 0,
            })
            .unwrap();
        assert_eq!(store.find_user("alice", "other@x").unwrap(), Some(uid));
        assert_eq!(store.find_user("other", "alice@example.com").unwrap(), Some(uid));
        assert_eq!(store.find_user("bob", "bob@x").unwrap(), None);
    }

    #[test]
    fn test_content_dedup_is_per_kind() {
        let store = memory_store();
        let cid = store.insert_content(&sample_content("about", "page")).unwrap();
        assert_eq!(store.find_content("about", "page").unwrap(), Some(cid));
        assert_eq!(store.find_content("about", "post").unwrap(), None);
    }

    #[test]
    fn test_meta_counter_bump() {
        let store = memory_store();
        let mid = store.insert_meta("Rust", "rust", "tag", "", 0).unwrap();
        store.bump_meta_count(mid).unwrap();
        store.bump_meta_count(mid).unwrap();
        let count: i64 = store
            .conn
            .query_row("SELECT count FROM typecho_metas WHERE mid = ?1", params![mid], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_relationship_existence() {
        let store = memory_store();
        assert!(!store.relationship_exists(1, 2).unwrap());
        store.insert_relationship(1, 2).unwrap();
        assert!(store.relationship_exists(1, 2).unwrap());
    }

    #[test]
    fn test_attachment_path_lookup() {
        let store = memory_store();
        let mut att = sample_content("photo-jpg", "attachment");
        att.text = r#"{"name":"photo.jpg","path":"/usr/uploads/2024/01/photo.jpg"}"#;
        let cid = store.insert_content(&att).unwrap();
        assert_eq!(
            store
                .find_attachment_by_path("/usr/uploads/2024/01/photo.jpg")
                .unwrap(),
            Some(cid)
        );
        // same filename under a different bucket is a different attachment
        assert_eq!(
            store
                .find_attachment_by_path("/usr/uploads/2024/02/photo.jpg")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_block_markup_scan_matches_both_signatures() {
        let store = memory_store();
        let mut a = sample_content("one", "post");
        a.text = "<!-- wp:paragraph --><p>x</p><!-- /wp:paragraph -->";
        let mut b = sample_content("two", "post");
        b.text = "<h2 class=\"wp-block-heading\">t</h2>";
        let mut c = sample_content("three", "post");
        c.text = "plain markdown";
        store.insert_content(&a).unwrap();
        store.insert_content(&b).unwrap();
        store.insert_content(&c).unwrap();
        let hits = store.contents_with_block_markup().unwrap();
        assert_eq!(hits.len(), 2);
    }
}
