use std::sync::Arc;

use flagsync::{AnyStore, CatalogFetcher, CycleOutcome, Synchronizer};

use crate::config::Config;
use crate::progress::LoggingReporter;
use crate::shutdown;

/// Open the store and wire up fetcher, schedule and log reporting.
pub(crate) async fn build_synchronizer(
    config: &Config,
) -> Result<Synchronizer<AnyStore>, Box<dyn std::error::Error>> {
    let schedule = config.schedule()?;
    let fetcher = CatalogFetcher::with_reqwest(config.source.url.clone(), config.fetch_timeout())?;
    let store = AnyStore::open(&config.store_options()).await?;

    let reporter = Arc::new(LoggingReporter::new());
    Ok(Synchronizer::new(store, fetcher, schedule).with_progress(reporter.into_callback()))
}

/// Run the sync loop until Ctrl+C or SIGTERM.
pub(crate) async fn handle_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let sync = build_synchronizer(config).await?;

    tracing::info!(
        url = %sync.fetcher().url(),
        schedule = %sync.schedule(),
        backend = %sync.store().backend(),
        "Starting flag identifier sync"
    );

    let summary = sync.run_until(shutdown::wait_for_shutdown()).await;

    tracing::info!(
        completed = summary.completed,
        failed = summary.failed,
        "Sync stopped"
    );

    sync.into_store().close().await?;
    Ok(())
}

/// Run a single cycle immediately.
pub(crate) async fn handle_once(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let sync = build_synchronizer(config).await?;

    let outcome = sync.execute_cycle().await;
    sync.into_store().close().await?;

    match outcome {
        CycleOutcome::Completed(report) => {
            println!(
                "Synced {} identifiers from {} services ({} replaced).",
                report.inserted, report.services, report.deleted
            );
            Ok(())
        }
        CycleOutcome::Failed(failure) => Err(Box::new(failure.error)),
    }
}
