//! Media resolver: downloads remotely referenced assets, deduplicates them
//! within the run, records attachment rows and rewrites references.
//!
//! Failures are local to one reference: the download is attempted once with
//! a fixed timeout, and on any error the original remote URL is left in
//! place and processing continues.

use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

use crate::config::MediaConfig;
use crate::store::TargetStore;
use crate::utils::date::{now, DateTimeUtc};
use crate::utils::slug::clean_slug;
use crate::{debug, log};

static MD_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());

static HTML_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<img[^>]+src="([^"]+)"[^>]*>"#).unwrap());

static YEAR_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/uploads/(\d{4})/(\d{2})/").unwrap());

/// Resolved descriptor for one downloaded asset. Valid for one run only.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    /// Local URL substituted into content
    pub url: String,
    /// Path stored in the attachment payload
    pub path: String,
    /// Final file name (after collision suffixing)
    pub name: String,
    /// Downloaded byte size
    pub size: u64,
    /// Extension without the dot
    pub ext: String,
    /// MIME type inferred from the extension
    pub mime: String,
}

/// Downloads and deduplicates remote assets referenced in content.
pub struct MediaResolver<'a> {
    config: &'a MediaConfig,
    agent: ureq::Agent,
    cache: HashMap<String, MediaInfo>,
}

impl<'a> MediaResolver<'a> {
    pub fn new(config: &'a MediaConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            config,
            agent,
            cache: HashMap::new(),
        }
    }

    /// Rewrite every downloadable image reference in `content` to its local
    /// path, creating attachment rows under `cid`. Returns the rewritten
    /// text and whether anything changed.
    pub fn process(&mut self, content: &str, cid: i64, target: &TargetStore) -> (String, bool) {
        let mut modified = false;

        let text = MD_IMAGE_RE
            .replace_all(content, |caps: &Captures<'_>| {
                let alt = caps[1].to_string();
                let url = caps[2].to_string();
                match self.rewrite(&url, cid, target) {
                    Some(info) => {
                        modified = true;
                        format!("![{alt}]({})", info.url)
                    }
                    None => caps[0].to_string(),
                }
            })
            .into_owned();

        let text = HTML_IMAGE_RE
            .replace_all(&text, |caps: &Captures<'_>| {
                let url = caps[1].to_string();
                match self.rewrite(&url, cid, target) {
                    Some(info) => {
                        modified = true;
                        caps[0].replace(&url, &info.url)
                    }
                    None => caps[0].to_string(),
                }
            })
            .into_owned();

        (text, modified)
    }

    /// Resolve one reference; `None` leaves the original reference in place.
    fn rewrite(&mut self, url: &str, cid: i64, target: &TargetStore) -> Option<MediaInfo> {
        if !self.should_download(url) {
            return None;
        }
        match self.resolve(url) {
            Ok(info) => {
                if let Err(e) = self.ensure_attachment(&info, cid, target) {
                    log!("media"; "failed to record attachment {}: {e}", info.name);
                }
                Some(info)
            }
            Err(e) => {
                log!("media"; "download failed ({url}): {e}");
                None
            }
        }
    }

    /// Only absolute http(s) URLs matching the allow-list are handled.
    fn should_download(&self, url: &str) -> bool {
        (url.starts_with("http://") || url.starts_with("https://"))
            && self
                .config
                .allowed_patterns
                .iter()
                .any(|pattern| url.contains(pattern.as_str()))
    }

    /// Cache-aware resolution: each remote URL downloads at most once per run.
    pub fn resolve(&mut self, remote: &str) -> Result<MediaInfo> {
        if let Some(info) = self.cache.get(remote) {
            debug!("media"; "cache hit for {remote}");
            return Ok(info.clone());
        }
        let info = self.download(remote)?;
        log!("media"; "downloaded {} -> {}", info.name, info.path);
        self.cache.insert(remote.to_string(), info.clone());
        Ok(info)
    }

    fn download(&self, remote: &str) -> Result<MediaInfo> {
        let parsed = Url::parse(remote).context("invalid asset URL")?;
        let url_path = parsed.path();

        // Bucket by the year/month segment of the original path; fall back
        // to the current date when the URL carries none.
        let year_month = match YEAR_MONTH_RE.captures(url_path) {
            Some(caps) => format!("{}/{}", &caps[1], &caps[2]),
            None => {
                let today = DateTimeUtc::from_unix(now());
                format!("{:04}/{:02}", today.year, today.month)
            }
        };

        let upload_dir = self
            .config
            .site_root
            .join(&self.config.upload_dir)
            .join(&year_month);
        fs::create_dir_all(&upload_dir)
            .with_context(|| format!("failed to create {}", upload_dir.display()))?;

        let original_name = url_path.rsplit('/').next().unwrap_or_default();
        if original_name.is_empty() {
            bail!("asset URL has no file name");
        }
        let (local_path, file_name) = unique_destination(&upload_dir, original_name);

        let response = self
            .agent
            .get(remote)
            .set("User-Agent", "Mozilla/5.0")
            .call()?;
        let mut data = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut data)
            .context("failed to read response body")?;

        fs::write(&local_path, &data)
            .with_context(|| format!("failed to write {}", local_path.display()))?;

        let ext = file_name
            .rsplit_once('.')
            .map(|(_, e)| e.to_lowercase())
            .unwrap_or_default();
        let relative = format!("/{}/{}/{}", self.config.upload_dir, year_month, file_name);

        Ok(MediaInfo {
            url: relative.clone(),
            path: relative,
            name: file_name,
            size: data.len() as u64,
            mime: mime_for_ext(&ext).to_string(),
            ext,
        })
    }

    /// Record an attachment row under the owning content item unless one
    /// already points at the same resolved storage path.
    fn ensure_attachment(&self, info: &MediaInfo, cid: i64, target: &TargetStore) -> Result<()> {
        if target.find_attachment_by_path(&info.path)?.is_some() {
            debug!("media"; "attachment {} already recorded", info.name);
            return Ok(());
        }

        let payload = serde_json::json!({
            "name": info.name,
            "path": info.path,
            "size": info.size,
            "type": info.ext,
            "mime": info.mime,
        })
        .to_string();

        let slug = clean_slug(&info.name).to_lowercase();
        let ts = now();
        target.insert_content(&crate::store::target::NewContent {
            title: &info.name,
            slug: &slug,
            created: ts,
            modified: ts,
            text: &payload,
            order: 0,
            author_id: 1,
            template: None,
            kind: "attachment",
            status: "publish",
            password: None,
            comments_num: 0,
            allow_comment: "1",
            allow_ping: "0",
            allow_feed: "1",
            parent: cid,
        })?;
        debug!("media"; "recorded attachment {}", info.name);
        Ok(())
    }
}

/// Pick a destination path that does not collide with an existing file by
/// appending `_N` before the extension.
fn unique_destination(dir: &std::path::Path, original: &str) -> (PathBuf, String) {
    let mut candidate = dir.join(original);
    let mut name = original.to_string();
    let (stem, ext) = match original.rsplit_once('.') {
        Some((s, e)) => (s.to_string(), format!(".{e}")),
        None => (original.to_string(), String::new()),
    };
    let mut counter = 1;
    while candidate.exists() {
        name = format!("{stem}_{counter}{ext}");
        candidate = dir.join(&name);
        counter += 1;
    }
    (candidate, name)
}

fn mime_for_ext(ext: &str) -> &'static str {
    match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "image/jpeg",
    }
}
