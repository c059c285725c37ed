//! `import` subcommand: WXR export file → SQL insert script.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::log;
use crate::wxr::{sql::SqlScript, WxrDocument};

pub fn run_import(wxr_file: &Path, output: &Path, prefix: &str) -> Result<()> {
    let xml = fs::read_to_string(wxr_file)
        .with_context(|| format!("failed to read WXR file {}", wxr_file.display()))?;
    let doc = WxrDocument::parse(&xml)?;
    log!("import"; "parsed `{}`: {} items, {} categories, {} tags",
        doc.title, doc.items.len(), doc.categories.len(), doc.tags.len());

    let script = SqlScript::generate(&doc, prefix);
    fs::write(output, script.as_str())
        .with_context(|| format!("failed to write {}", output.display()))?;
    log!("import"; "wrote {}", output.display());
    Ok(())
}
