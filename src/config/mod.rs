//! Tool configuration loaded from `wp2typecho.toml`.
//!
//! # Sections
//!
//! | Section       | Purpose                                        |
//! |---------------|------------------------------------------------|
//! | `[source]`    | WordPress store path and table prefix          |
//! | `[target]`    | Typecho store path and table prefix            |
//! | `[migration]` | Per-kind enable flags, filters, default login  |
//! | `[media]`     | Site root, upload dir, allow-list, timeout     |

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error when reading `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config file parsing error")]
    Toml(#[from] toml::de::Error),

    #[error("Config validation error: {0}")]
    Validation(String),
}

// ============================================================================
// Root configuration
// ============================================================================

/// Root configuration structure representing wp2typecho.toml
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MigrateConfig {
    #[serde(default)]
    pub source: StoreConfig,

    #[serde(default)]
    pub target: TargetStoreConfig,

    #[serde(default)]
    pub migration: MigrationFlags,

    #[serde(default)]
    pub media: MediaConfig,
}

/// `[source]` — the read-only WordPress store.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the source database file
    pub path: PathBuf,

    /// Table prefix for source tables
    #[serde(default = "default_source_prefix")]
    pub table_prefix: String,
}

/// `[target]` — the read-write Typecho store.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetStoreConfig {
    /// Path to the target database file
    pub path: PathBuf,

    /// Table prefix for target tables
    #[serde(default = "default_target_prefix")]
    pub table_prefix: String,
}

/// `[migration]` — which entity kinds to migrate and how.
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationFlags {
    #[serde(default)]
    pub users: bool,

    #[serde(default = "default_true")]
    pub categories: bool,

    #[serde(default = "default_true")]
    pub tags: bool,

    #[serde(default = "default_true")]
    pub posts: bool,

    #[serde(default = "default_true")]
    pub pages: bool,

    #[serde(default)]
    pub comments: bool,

    /// Only migrate published content
    #[serde(default = "default_true")]
    pub only_published: bool,

    /// Password assigned to every migrated user (stored hashed)
    #[serde(default = "default_password")]
    pub default_password: String,
}

/// `[media]` — remote asset download settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Typecho installation root; downloads land under it
    #[serde(default = "default_site_root")]
    pub site_root: PathBuf,

    /// Upload directory relative to the site root
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Substring patterns a remote URL must match to be downloaded
    #[serde(default = "default_allowed_patterns")]
    pub allowed_patterns: Vec<String>,

    /// Per-download timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_source_prefix() -> String {
    "wp_".into()
}
fn default_target_prefix() -> String {
    "typecho_".into()
}
fn default_true() -> bool {
    true
}
fn default_password() -> String {
    "typecho123".into()
}
fn default_site_root() -> PathBuf {
    PathBuf::from("/var/www/typecho")
}
fn default_upload_dir() -> String {
    "usr/uploads".into()
}
fn default_allowed_patterns() -> Vec<String> {
    vec!["wp-content/uploads".into()]
}
fn default_timeout() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("wordpress.db"),
            table_prefix: default_source_prefix(),
        }
    }
}

impl Default for TargetStoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("typecho.db"),
            table_prefix: default_target_prefix(),
        }
    }
}

impl Default for MigrationFlags {
    fn default() -> Self {
        Self {
            users: false,
            categories: true,
            tags: true,
            posts: true,
            pages: true,
            comments: false,
            only_published: true,
            default_password: default_password(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            site_root: default_site_root(),
            upload_dir: default_upload_dir(),
            allowed_patterns: default_allowed_patterns(),
            timeout_secs: default_timeout(),
        }
    }
}

impl MigrateConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.source.table_prefix.is_empty() || self.target.table_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "table prefixes must not be empty".into(),
            ));
        }
        if self.media.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "media.timeout_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
