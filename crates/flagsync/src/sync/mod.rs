//! The sync loop and its building blocks.
//!
//! # Module Structure
//!
//! - [`engine`] - `Synchronizer`: wait, fetch, flatten, reconcile, repeat
//! - `reconcile` - delete-then-insert of one batch
//! - `progress` - `SyncProgress`, `ProgressCallback`, `emit()`
//! - `types` - cycle reports and outcomes
//! - `error` - `SyncError`

pub mod engine;
mod error;
mod progress;
mod reconcile;
mod types;

pub use engine::Synchronizer;
pub use error::SyncError;
pub use progress::{ProgressCallback, SyncProgress, emit};
pub use reconcile::reconcile;
pub use types::{CycleFailure, CycleOutcome, CycleReport, LoopSummary, ReconcileStats};
