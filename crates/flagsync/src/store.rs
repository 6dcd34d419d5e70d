//! Record stores.
//!
//! The reconciler talks to a [`RecordStore`]. Two backends exist, picked by
//! the scheme of the configured URI:
//!
//! - `mongodb://`, `mongodb+srv://` - [`MongoStore`] (feature `mongodb`)
//! - `sqlite:`, `postgres://`, `postgresql://` - [`SqlStore`] over SeaORM

mod errors;
pub mod sql;

#[cfg(feature = "mongodb")]
pub mod mongo;

#[cfg(test)]
pub(crate) mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{FlagRecord, RecordKey};

pub use errors::{Result, StoreError};
#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;
pub use sql::SqlStore;

/// Default store URI.
pub const DEFAULT_STORE_URI: &str = "mongodb://localhost:27017/";
/// Default MongoDB database name.
pub const DEFAULT_DATABASE: &str = "tulip";
/// Default MongoDB collection name.
pub const DEFAULT_COLLECTION: &str = "flagids";
/// Default MongoDB server selection timeout.
pub const DEFAULT_SELECTION_TIMEOUT: Duration = Duration::from_millis(200);

/// Persistence operations the reconciler and `list` need.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Delete every record whose (service, team, round, flagid) equals `key`.
    async fn delete_matching(&self, key: &RecordKey) -> Result<u64>;

    async fn insert_many(&self, records: &[FlagRecord]) -> Result<u64>;

    /// Records matching `filter`, sorted by service, team, round, description.
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<FlagRecord>>;
}

/// Optional equality constraints for [`RecordStore::find`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub service: Option<String>,
    pub team: Option<i64>,
    pub round: Option<i64>,
}

impl RecordFilter {
    pub fn matches(&self, record: &FlagRecord) -> bool {
        self.service.as_deref().is_none_or(|s| s == record.service)
            && self.team.is_none_or(|t| t == record.team)
            && self.round.is_none_or(|r| r == record.round)
    }
}

/// Connection settings for [`AnyStore::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub uri: String,
    /// MongoDB only.
    pub database: String,
    /// MongoDB only.
    pub collection: String,
    /// MongoDB only.
    pub selection_timeout: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            uri: DEFAULT_STORE_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            selection_timeout: DEFAULT_SELECTION_TIMEOUT,
        }
    }
}

/// Backend family behind a store URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sql,
    Mongo,
}

impl Backend {
    /// Pick the backend from the URI scheme.
    ///
    /// # Errors
    /// `StoreError::UnsupportedScheme` for anything that is not a known
    /// SQL or MongoDB scheme.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let scheme = uri
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();
        match scheme.as_str() {
            "mongodb" | "mongodb+srv" => Ok(Self::Mongo),
            "sqlite" | "postgres" | "postgresql" => Ok(Self::Sql),
            _ => Err(StoreError::UnsupportedScheme {
                uri: uri.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Sql => f.write_str("sql"),
            Backend::Mongo => f.write_str("mongodb"),
        }
    }
}

/// A store opened from configuration.
#[derive(Debug, Clone)]
pub enum AnyStore {
    Sql(SqlStore),
    #[cfg(feature = "mongodb")]
    Mongo(MongoStore),
}

impl AnyStore {
    /// Open the backend named by `options.uri`.
    ///
    /// SQL backends are migrated on open. A MongoDB server that does not
    /// answer the startup ping is only logged; later cycles retry.
    ///
    /// # Errors
    /// Returns `StoreError` if the URI is unsupported or the connection
    /// cannot be set up.
    pub async fn open(options: &StoreOptions) -> Result<Self> {
        match Backend::from_uri(&options.uri)? {
            Backend::Sql => {
                let store = SqlStore::connect(&options.uri).await?;
                tracing::info!(backend = %Backend::Sql, "Opened store");
                Ok(Self::Sql(store))
            }
            #[cfg(feature = "mongodb")]
            Backend::Mongo => {
                let store = MongoStore::connect(
                    &options.uri,
                    &options.database,
                    &options.collection,
                    options.selection_timeout,
                )
                .await?;
                if let Err(e) = store.ping().await {
                    tracing::warn!(
                        error = %e,
                        "MongoDB did not answer ping; will retry on each cycle"
                    );
                }
                tracing::info!(
                    backend = %Backend::Mongo,
                    database = %options.database,
                    collection = %options.collection,
                    "Opened store"
                );
                Ok(Self::Mongo(store))
            }
            #[cfg(not(feature = "mongodb"))]
            Backend::Mongo => Err(StoreError::UnsupportedScheme {
                uri: options.uri.clone(),
            }),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::Sql(_) => Backend::Sql,
            #[cfg(feature = "mongodb")]
            Self::Mongo(_) => Backend::Mongo,
        }
    }

    pub async fn ping(&self) -> Result<()> {
        match self {
            Self::Sql(store) => store.ping().await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(store) => store.ping().await,
        }
    }

    /// Release the underlying connection pool or client.
    pub async fn close(self) -> Result<()> {
        match self {
            Self::Sql(store) => store.close().await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(store) => {
                store.close().await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RecordStore for AnyStore {
    async fn delete_matching(&self, key: &RecordKey) -> Result<u64> {
        match self {
            Self::Sql(store) => store.delete_matching(key).await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(store) => store.delete_matching(key).await,
        }
    }

    async fn insert_many(&self, records: &[FlagRecord]) -> Result<u64> {
        match self {
            Self::Sql(store) => store.insert_many(records).await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(store) => store.insert_many(records).await,
        }
    }

    async fn find(&self, filter: &RecordFilter) -> Result<Vec<FlagRecord>> {
        match self {
            Self::Sql(store) => store.find(filter).await,
            #[cfg(feature = "mongodb")]
            Self::Mongo(store) => store.find(filter).await,
        }
    }
}
