//! flagsync - keeps a store of attack/defense flag identifiers in step with
//! the game server's catalog.
//!
//! The game server publishes a nested JSON catalog
//! (`service → team → round → description → flag identifier`). A
//! [`Synchronizer`] fetches it on a schedule, flattens it into
//! [`FlagRecord`]s and reconciles them into a [`RecordStore`] by deleting
//! every record with the same (service, team, round, flagid) key before
//! inserting the fresh batch.
//!
//! # Features
//!
//! - `mongodb` - MongoDB document store ([`store::MongoStore`]).
//! - `sqlite` / `postgres` - SQL store drivers for [`store::SqlStore`].
//! - `migrate` - schema migrations. SQL stores are migrated on open via
//!   [`connect_and_migrate`].
//!
//! # Example
//!
//! ```ignore
//! use flagsync::{AnyStore, CatalogFetcher, Schedule, StoreOptions, Synchronizer};
//!
//! let store = AnyStore::open(&StoreOptions::default()).await?;
//! let fetcher = CatalogFetcher::with_reqwest(url, flagsync::fetch::DEFAULT_FETCH_TIMEOUT)?;
//! let report = Synchronizer::new(store, fetcher, Schedule::default())
//!     .run_cycle()
//!     .await?;
//! println!("{} identifiers stored", report.inserted);
//! ```

pub mod catalog;
pub mod db;
pub mod entity;
pub mod fetch;
pub mod http;
pub mod schedule;
pub mod store;
pub mod sync;

#[cfg(feature = "migrate")]
pub mod migration;

pub use catalog::{Catalog, FlagRecord, MalformedKeyError, RecordKey, flatten};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use fetch::{CatalogFetcher, DecodeError, FetchError};
pub use schedule::{Clock, Schedule, ScheduleError, SystemClock};
pub use store::{AnyStore, Backend, RecordFilter, RecordStore, StoreError, StoreOptions};
pub use sync::{CycleOutcome, CycleReport, SyncError, SyncProgress, Synchronizer};
