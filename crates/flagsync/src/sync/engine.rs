//! The cycle controller.
//!
//! A [`Synchronizer`] owns one store, one fetcher and one schedule, and runs
//! `wait → fetch → flatten → reconcile` forever. Steps run strictly in
//! sequence and cycles never overlap. A failed cycle is reported and the loop
//! carries on; the next cycle is the retry.
//!
//! # Example
//!
//! ```ignore
//! use flagsync::{AnyStore, CatalogFetcher, Schedule, StoreOptions, Synchronizer};
//!
//! let store = AnyStore::open(&StoreOptions::default()).await?;
//! let fetcher = CatalogFetcher::with_reqwest("http://10.10.0.1:8081/flagId", timeout)?;
//! let sync = Synchronizer::new(store, fetcher, Schedule::default());
//!
//! sync.run_until(tokio::signal::ctrl_c().map(|_| ())).await;
//! sync.into_store().close().await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::error::SyncError;
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::reconcile::reconcile;
use super::types::{CycleFailure, CycleOutcome, CycleReport, LoopSummary};
use crate::catalog::flatten;
use crate::fetch::CatalogFetcher;
use crate::schedule::{Clock, Schedule, SystemClock};
use crate::store::RecordStore;

/// Periodic catalog-to-store synchronizer.
pub struct Synchronizer<S> {
    store: S,
    fetcher: CatalogFetcher,
    schedule: Schedule,
    clock: Arc<dyn Clock>,
    on_progress: Option<ProgressCallback>,
}

impl<S: RecordStore> Synchronizer<S> {
    pub fn new(store: S, fetcher: CatalogFetcher, schedule: Schedule) -> Self {
        Self {
            store,
            fetcher,
            schedule,
            clock: Arc::new(SystemClock),
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: ProgressCallback) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn fetcher(&self) -> &CatalogFetcher {
        &self.fetcher
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Give the store back, e.g. to close it on shutdown.
    pub fn into_store(self) -> S {
        self.store
    }

    fn progress(&self) -> Option<&ProgressCallback> {
        self.on_progress.as_ref()
    }

    /// One fetch, flatten and reconcile pass, without waiting.
    ///
    /// Every record written carries one clock reading, taken after the
    /// catalog arrives and before flattening starts.
    ///
    /// # Errors
    /// Returns the first `SyncError` hit. Nothing is written to the store
    /// unless fetch and flatten both succeeded.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        self.cycle_at(self.clock.now()).await
    }

    async fn cycle_at(&self, started_at: DateTime<Utc>) -> Result<CycleReport, SyncError> {
        let url = self.fetcher.url().to_string();

        emit(self.progress(), SyncProgress::Fetching { url: url.clone() });
        let catalog = self.fetcher.fetch().await?;
        emit(
            self.progress(),
            SyncProgress::Fetched {
                url,
                services: catalog.service_count(),
                identifiers: catalog.identifier_count(),
            },
        );

        let flattened_at = self.clock.now();
        let records = flatten(&catalog, flattened_at)?;
        emit(
            self.progress(),
            SyncProgress::Flattened {
                records: records.len(),
            },
        );

        let stats = reconcile(&self.store, &records).await?;
        emit(
            self.progress(),
            SyncProgress::Reconciled {
                deleted: stats.deleted,
                inserted: stats.inserted,
                collapsed: stats.collapsed,
            },
        );

        Ok(CycleReport {
            started_at,
            flattened_at,
            services: catalog.service_count(),
            records: records.len(),
            deleted: stats.deleted,
            inserted: stats.inserted,
        })
    }

    /// Run one cycle immediately, reporting instead of returning errors.
    pub async fn execute_cycle(&self) -> CycleOutcome {
        let started_at = self.clock.now();

        match self.cycle_at(started_at).await {
            Ok(report) => {
                emit(
                    self.progress(),
                    SyncProgress::CycleComplete {
                        started_at: report.started_at,
                        services: report.services,
                        records: report.records,
                        deleted: report.deleted,
                        inserted: report.inserted,
                    },
                );
                CycleOutcome::Completed(report)
            }
            Err(error) => {
                tracing::debug!(kind = error.kind(), error = ?error, "Cycle failed");
                emit(
                    self.progress(),
                    SyncProgress::CycleFailed {
                        url: self.fetcher.url().to_string(),
                        kind: error.kind(),
                        error: error.to_string(),
                        started_at,
                    },
                );
                CycleOutcome::Failed(CycleFailure { started_at, error })
            }
        }
    }

    /// Compute and announce the wait before the next cycle.
    fn next_wait(&self) -> Duration {
        let now = self.clock.now();
        let wait = self.schedule.wait_from(now);
        emit(
            self.progress(),
            SyncProgress::Waiting {
                duration: wait,
                until: self.schedule.next_run(now).max(now),
            },
        );
        wait
    }

    /// Wait per the schedule, then run one cycle.
    pub async fn tick(&self) -> CycleOutcome {
        let wait = self.next_wait();
        self.clock.sleep(wait).await;
        self.execute_cycle().await
    }

    /// Loop [`tick`](Self::tick) until `shutdown` resolves.
    ///
    /// Shutdown is only observed while waiting; a cycle that has started
    /// always runs to completion.
    pub async fn run_until<F>(&self, shutdown: F) -> LoopSummary
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        let mut summary = LoopSummary::default();

        tracing::debug!(schedule = %self.schedule, url = %self.fetcher.url(), "Sync loop started");

        loop {
            let wait = self.next_wait();
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = self.clock.sleep(wait) => {}
            }

            if self.execute_cycle().await.is_completed() {
                summary.completed += 1;
            } else {
                summary.failed += 1;
            }
        }

        tracing::debug!(
            completed = summary.completed,
            failed = summary.failed,
            "Sync loop stopped"
        );
        summary
    }
}
