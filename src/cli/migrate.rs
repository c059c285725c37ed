//! `migrate` subcommand: source store → target store.

use anyhow::Result;

use crate::config::MigrateConfig;
use crate::log;
use crate::migrate::Migrator;

pub fn run_migrate(config: MigrateConfig, dry_run: bool) -> Result<()> {
    log!("migrate"; "source `{}` -> target `{}`",
        config.source.path.display(), config.target.path.display());
    let mut migrator = Migrator::new(config)?;
    if dry_run {
        migrator.dry_run()
    } else {
        migrator.run()
    }
}
