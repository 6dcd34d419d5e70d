//! Turns sync progress events into log lines.
//!
//! Per-step events go to `debug`, so a default `info` filter shows one line
//! per cycle: a summary on success or an error carrying the source URL, the
//! error kind and the cycle timestamp.

use std::sync::Arc;

use flagsync::sync::{ProgressCallback, SyncProgress};

/// Logging reporter using tracing for structured output.
#[derive(Debug, Default)]
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::Waiting { duration, until } => {
                tracing::debug!(
                    wait_secs = duration.as_secs_f64(),
                    until = %until.to_rfc3339(),
                    "Waiting for next cycle"
                );
            }

            SyncProgress::Fetching { url } => {
                tracing::debug!(url = %url, "Fetching flag identifiers");
            }

            SyncProgress::Fetched {
                url,
                services,
                identifiers,
            } => {
                tracing::debug!(url = %url, services, identifiers, "Fetched catalog");
            }

            SyncProgress::Flattened { records } => {
                tracing::debug!(records, "Flattened catalog");
            }

            SyncProgress::Reconciled {
                deleted,
                inserted,
                collapsed,
            } => {
                if collapsed > 0 {
                    tracing::debug!(
                        collapsed,
                        "Duplicate identifiers in catalog, kept the last of each"
                    );
                }
                tracing::debug!(deleted, inserted, "Reconciled store");
            }

            SyncProgress::CycleComplete {
                started_at,
                services,
                records,
                deleted,
                inserted,
            } => {
                tracing::info!(
                    started_at = %started_at.to_rfc3339(),
                    services,
                    records,
                    deleted,
                    inserted,
                    "Sync cycle complete"
                );
            }

            SyncProgress::CycleFailed {
                url,
                kind,
                error,
                started_at,
            } => {
                tracing::error!(
                    url = %url,
                    kind,
                    error = %error,
                    started_at = %started_at.to_rfc3339(),
                    "Sync cycle failed"
                );
            }

            _ => {}
        }
    }

    /// Convert to a `ProgressCallback` for the library.
    pub fn into_callback(self: Arc<Self>) -> ProgressCallback {
        Box::new(move |event| self.handle(event))
    }
}
