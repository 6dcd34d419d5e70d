//! Progress reporting for the sync loop.
//!
//! The library never decides how events are shown. The CLI installs a
//! callback that turns them into log lines.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Events emitted by the [`Synchronizer`](super::Synchronizer).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Sleeping until the next scheduled cycle.
    Waiting {
        /// How long the loop is about to sleep.
        duration: Duration,
        /// When the next cycle starts.
        until: DateTime<Utc>,
    },

    /// Starting the HTTP request.
    Fetching { url: String },

    /// Catalog received and decoded.
    Fetched {
        url: String,
        services: usize,
        identifiers: usize,
    },

    /// Catalog flattened into records.
    Flattened { records: usize },

    /// Store brought in line with the batch.
    Reconciled {
        deleted: u64,
        inserted: u64,
        collapsed: usize,
    },

    /// Cycle finished successfully.
    CycleComplete {
        started_at: DateTime<Utc>,
        services: usize,
        records: usize,
        deleted: u64,
        inserted: u64,
    },

    /// Cycle aborted; the loop continues.
    CycleFailed {
        url: String,
        /// Stable label from [`SyncError::kind`](super::SyncError::kind).
        kind: &'static str,
        error: String,
        started_at: DateTime<Utc>,
    },
}

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
