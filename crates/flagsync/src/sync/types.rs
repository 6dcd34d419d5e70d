//! Cycle results.

use chrono::{DateTime, Utc};

use super::error::SyncError;

/// What one successful reconciliation changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Records removed by delete-by-key, including stale ones from earlier cycles.
    pub deleted: u64,
    /// Records written.
    pub inserted: u64,
    /// Records dropped because a later record in the batch had the same key.
    pub collapsed: usize,
}

/// Summary of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Clock reading when the cycle began, before the fetch.
    pub started_at: DateTime<Utc>,
    /// Timestamp written to every record, taken once the catalog arrived.
    pub flattened_at: DateTime<Utc>,
    /// Services present in the catalog.
    pub services: usize,
    /// Records produced by flattening.
    pub records: usize,
    pub deleted: u64,
    pub inserted: u64,
}

/// A cycle that aborted.
#[derive(Debug)]
pub struct CycleFailure {
    pub started_at: DateTime<Utc>,
    pub error: SyncError,
}

/// Result of [`Synchronizer::tick`](super::Synchronizer::tick).
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Failed(CycleFailure),
}

impl CycleOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Completed(_) => None,
            Self::Failed(failure) => Some(&failure.error),
        }
    }
}

/// Totals for a [`Synchronizer::run_until`](super::Synchronizer::run_until) loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub completed: u64,
    pub failed: u64,
}
