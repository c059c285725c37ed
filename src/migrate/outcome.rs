//! Per-entity outcomes and per-phase counters.

use std::fmt;

/// What happened to one source entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrateOutcome {
    /// Inserted into the target; carries the new target id.
    Created(i64),
    /// Natural-key dedup found an existing row; carries its target id.
    Existing(i64),
    /// Not migrated, with the reason (for example a comment whose owner
    /// never arrived).
    Skipped(&'static str),
}

impl MigrateOutcome {
    /// Target id when the entity exists on the target side.
    pub fn target_id(&self) -> Option<i64> {
        match self {
            Self::Created(id) | Self::Existing(id) => Some(*id),
            Self::Skipped(_) => None,
        }
    }
}

/// Counters for one migration phase.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PhaseStats {
    pub created: u64,
    pub existing: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl PhaseStats {
    pub fn record(&mut self, outcome: &MigrateOutcome) {
        match outcome {
            MigrateOutcome::Created(_) => self.created += 1,
            MigrateOutcome::Existing(_) => self.existing += 1,
            MigrateOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u64 {
        self.created + self.existing + self.skipped + self.failed
    }
}

impl fmt::Display for PhaseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} existing, {} skipped, {} failed",
            self.created, self.existing, self.skipped, self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_recording() {
        let mut stats = PhaseStats::default();
        stats.record(&MigrateOutcome::Created(1));
        stats.record(&MigrateOutcome::Created(2));
        stats.record(&MigrateOutcome::Existing(1));
        stats.record(&MigrateOutcome::Skipped("no owner"));
        stats.record_failure();
        assert_eq!(stats.created, 2);
        assert_eq!(stats.existing, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total(), 5);
    }

    #[test]
    fn test_target_id() {
        assert_eq!(MigrateOutcome::Created(7).target_id(), Some(7));
        assert_eq!(MigrateOutcome::Existing(3).target_id(), Some(3));
        assert_eq!(MigrateOutcome::Skipped("no owner").target_id(), None);
    }
}
