//! Command-line interface module.

mod args;
pub mod convert;
pub mod import_wxr;
pub mod migrate;

pub use args::{Cli, Commands};
