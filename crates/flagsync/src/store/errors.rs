use sea_orm::DbErr;
use thiserror::Error;

/// Errors raised by a record store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sea-orm.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// Error from the MongoDB driver.
    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// The store URI names a backend this build cannot talk to.
    #[error("Unsupported store URI scheme: {uri}")]
    UnsupportedScheme { uri: String },

    /// A stored record could not be read back.
    #[error("Corrupt stored record: {message}")]
    Corrupt { message: String },
}

impl StoreError {
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
