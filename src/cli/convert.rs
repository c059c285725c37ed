//! `convert` subcommand: rewrite block markup already stored on the target
//! and localize the remote images the rewritten text references.

use anyhow::{bail, Result};

use crate::config::MigrateConfig;
use crate::markdown::transpile;
use crate::media::MediaResolver;
use crate::store::TargetStore;
use crate::{debug, log};

/// Commit after this many rewritten items.
const CONVERT_BATCH: u64 = 10;
/// Characters of converted text shown by `--preview`.
const PREVIEW_LEN: usize = 500;

pub fn run_convert(config: &MigrateConfig, dry_run: bool, preview: Option<i64>) -> Result<()> {
    let target = TargetStore::open(&config.target.path, &config.target.table_prefix)?;

    if let Some(cid) = preview {
        return preview_one(&target, cid);
    }

    let items = target.contents_with_block_markup()?;
    if dry_run {
        for (cid, title, text) in &items {
            let rewritten = transpile(text);
            log!("convert"; "would convert {cid}: {title} ({} -> {} chars)",
                text.chars().count(), rewritten.chars().count());
        }
        log!("convert"; "{} items carry block markup, nothing written", items.len());
        return Ok(());
    }

    let mut resolver = MediaResolver::new(&config.media);
    let mut converted = 0u64;
    target.begin()?;
    for (cid, title, text) in &items {
        let rewritten = transpile(text);
        // Conversion and media localization run as a pair: the flattened
        // text is the form the image references are easiest to find in.
        let (localized, _) = resolver.process(&rewritten, *cid, &target);
        if &localized == text {
            debug!("convert"; "{cid}: {title} unchanged");
            continue;
        }
        target.update_content_text(*cid, &localized)?;
        converted += 1;
        debug!("convert"; "converted {cid}: {title}");
        if converted % CONVERT_BATCH == 0 {
            target.checkpoint()?;
        }
    }
    target.commit()?;
    log!("convert"; "converted {converted} of {} flagged items", items.len());
    Ok(())
}

/// Show the stored text and what the transpiler would produce for one
/// item, without writing.
fn preview_one(target: &TargetStore, cid: i64) -> Result<()> {
    let Some((cid, title, text)) = target.content_by_id(cid)? else {
        bail!("no content with cid {cid}");
    };
    let rewritten = transpile(&text);
    log!("convert"; "preview of {cid}: {title}");
    log!("convert"; "--- stored ---");
    print_truncated(&text);
    log!("convert"; "--- converted ---");
    print_truncated(&rewritten);
    Ok(())
}

fn print_truncated(text: &str) {
    let shown: String = text.chars().take(PREVIEW_LEN).collect();
    println!("{shown}");
    let total = text.chars().count();
    if total > PREVIEW_LEN {
        println!("... ({} more characters)", total - PREVIEW_LEN);
    }
}
