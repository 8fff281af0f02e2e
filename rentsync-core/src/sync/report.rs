use std::fmt;

use crate::entity::EntityType;
use crate::remote::RemoteError;

/// How the pull phase of a pass ended.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PullStatus {
    #[default]
    Completed,
    /// The backend could not be reached; local state was left untouched.
    SkippedUnreachable,
    /// The list call failed for another reason; local state was left untouched.
    Failed(RemoteError),
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub entity_type: EntityType,
    pub pushed_creates: usize,
    pub pushed_updates: usize,
    pub pushed_deletes: usize,
    /// Push calls that failed; the records stay pending.
    pub push_failures: usize,
    pub pull: PullStatus,
    pub pulled_inserts: usize,
    pub pulled_updates: usize,
    pub pulled_removals: usize,
    /// Remote records ignored because the local copy has a pending flag.
    pub skipped_pending: usize,
}

impl SyncReport {
    pub fn new(entity_type: EntityType) -> Self {
        Self {
            entity_type,
            pushed_creates: 0,
            pushed_updates: 0,
            pushed_deletes: 0,
            push_failures: 0,
            pull: PullStatus::Completed,
            pulled_inserts: 0,
            pulled_updates: 0,
            pulled_removals: 0,
            skipped_pending: 0,
        }
    }

    pub fn pushed(&self) -> usize {
        self.pushed_creates + self.pushed_updates + self.pushed_deletes
    }

    pub fn pulled(&self) -> usize {
        self.pulled_inserts + self.pulled_updates + self.pulled_removals
    }

    /// Soft failures: failed push calls plus a failed or skipped pull.
    pub fn failures(&self) -> usize {
        let pull_failure = usize::from(self.pull != PullStatus::Completed);
        self.push_failures + pull_failure
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: pushed {} (create {}, update {}, delete {}), pulled {} (new {}, changed {}, removed {})",
            self.entity_type,
            self.pushed(),
            self.pushed_creates,
            self.pushed_updates,
            self.pushed_deletes,
            self.pulled(),
            self.pulled_inserts,
            self.pulled_updates,
            self.pulled_removals,
        )?;
        if self.push_failures > 0 {
            write!(f, ", {} push failure(s)", self.push_failures)?;
        }
        match &self.pull {
            PullStatus::Completed => Ok(()),
            PullStatus::SkippedUnreachable => write!(f, ", pull skipped (backend unreachable)"),
            PullStatus::Failed(e) => write!(f, ", pull failed ({})", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_counts_pull() {
        let mut report = SyncReport::new(EntityType::Vehicles);
        assert!(report.is_clean());

        report.push_failures = 2;
        report.pull = PullStatus::SkippedUnreachable;
        assert_eq!(report.failures(), 3);
        assert!(report.to_string().contains("pull skipped"));
    }
}
