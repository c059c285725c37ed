//! Store access: the read-only source (WordPress schema) and the
//! read-write target (Typecho schema).
//!
//! Both sides hold one long-lived synchronous connection for the run's
//! duration. The target additionally owns the batch-commit discipline:
//! phases open an explicit transaction, checkpoint it at fixed batch
//! boundaries and commit once more when the phase ends.

pub mod source;
pub mod target;

pub use source::SourceStore;
pub use target::TargetStore;
