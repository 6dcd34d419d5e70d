//! Retrieval of the flag identifier catalog over HTTP.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::catalog::Catalog;
use crate::http::{HttpError, HttpRequest, HttpTransport, reqwest_transport::ReqwestTransport};
use crate::sync::SyncError;

/// Catalog endpoint of a locally running game server.
pub const DEFAULT_SOURCE_URL: &str = "http://localhost:8081/flagId";

/// Upper bound on a single catalog request.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The catalog could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    fn from_http(url: &str, timeout: Duration, err: HttpError) -> Self {
        let url = url.to_string();
        match err {
            HttpError::Connect(message) => Self::Connect { url, message },
            HttpError::Timeout(_) => Self::Timeout { url, timeout },
            HttpError::Transport(message) => Self::Transport { url, message },
            other => Self::Transport {
                url,
                message: other.to_string(),
            },
        }
    }
}

/// The catalog body is not the expected nested JSON object.
#[derive(Debug, Error)]
#[error("could not decode catalog from {url}: {message}")]
pub struct DecodeError {
    pub url: String,
    pub message: String,
}

/// Fetches the catalog from one configured URL.
#[derive(Clone)]
pub struct CatalogFetcher {
    url: String,
    timeout: Duration,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for CatalogFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogFetcher")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CatalogFetcher {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            url: url.into(),
            timeout,
            transport,
        }
    }

    /// Build a fetcher backed by a reqwest client with the same timeout.
    ///
    /// # Errors
    /// Returns a `FetchError::Transport` if the HTTP client cannot be built.
    pub fn with_reqwest(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let url = url.into();
        let transport = ReqwestTransport::with_timeout(timeout)
            .map_err(|e| FetchError::from_http(&url, timeout, e))?;
        Ok(Self::new(url, timeout, Arc::new(transport)))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue one GET and decode the body.
    ///
    /// # Errors
    /// `SyncError::Fetch` for transport failures, timeouts and statuses of
    /// 400 and above. `SyncError::Decode` when the body is not a catalog.
    pub async fn fetch(&self) -> Result<Catalog, SyncError> {
        let request = HttpRequest::get(&self.url).header("Accept", "application/json");

        let response = match tokio::time::timeout(self.timeout, self.transport.send(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(FetchError::from_http(&self.url, self.timeout, err).into()),
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: self.url.clone(),
                    timeout: self.timeout,
                }
                .into());
            }
        };

        if response.is_error() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status: response.status,
            }
            .into());
        }

        tracing::debug!(
            url = %self.url,
            status = response.status,
            bytes = response.body.len(),
            "Fetched catalog"
        );

        Catalog::from_json(&response.body).map_err(|e| {
            DecodeError {
                url: self.url.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }
}
