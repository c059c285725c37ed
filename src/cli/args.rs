//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// wp2typecho blog migration CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: wp2typecho.toml)
    #[arg(short = 'C', long, default_value = "wp2typecho.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Migrate users, terms, content and comments into the target store
    #[command(visible_alias = "m")]
    Migrate {
        /// Report what would be migrated without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Convert block markup already on the target into Markdown
    #[command(visible_alias = "c")]
    Convert {
        /// Report what would be converted without writing anything
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Preview the conversion of one content item
        #[arg(short, long, value_name = "CID", conflicts_with = "dry_run")]
        preview: Option<i64>,
    },

    /// Generate a SQL import script from a WXR export file
    #[command(visible_alias = "i")]
    Import {
        /// Path to the WXR export file
        #[arg(value_hint = clap::ValueHint::FilePath)]
        wxr_file: PathBuf,

        /// Output SQL file
        #[arg(short, long, default_value = "import.sql", value_hint = clap::ValueHint::FilePath)]
        output: PathBuf,

        /// Table prefix used in the generated statements
        #[arg(short, long, default_value = "typecho_")]
        prefix: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_migrate_dry_run() {
        let cli = Cli::try_parse_from(["wp2typecho", "migrate", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Commands::Migrate { dry_run: true }));
    }

    #[test]
    fn test_subcommand_aliases() {
        let cli = Cli::try_parse_from(["wp2typecho", "c", "--preview", "42"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Convert {
                dry_run: false,
                preview: Some(42)
            }
        ));
    }

    #[test]
    fn test_import_defaults() {
        let cli = Cli::try_parse_from(["wp2typecho", "import", "export.xml"]).unwrap();
        let Commands::Import {
            wxr_file,
            output,
            prefix,
        } = cli.command
        else {
            panic!("expected import");
        };
        assert_eq!(wxr_file, PathBuf::from("export.xml"));
        assert_eq!(output, PathBuf::from("import.sql"));
        assert_eq!(prefix, "typecho_");
    }

    #[test]
    fn test_preview_conflicts_with_dry_run() {
        assert!(Cli::try_parse_from(["wp2typecho", "convert", "--dry-run", "--preview", "1"]).is_err());
    }
}
