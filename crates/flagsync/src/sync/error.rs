use thiserror::Error;

use crate::catalog::MalformedKeyError;
use crate::fetch::{DecodeError, FetchError};
use crate::store::StoreError;

/// Any failure that aborts a single sync cycle.
///
/// None of these end the daemon loop; the next cycle is the retry.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    MalformedKey(#[from] MalformedKeyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Stable short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Decode(_) => "decode",
            Self::MalformedKey(_) => "malformed_key",
            Self::Store(_) => "store",
        }
    }
}
