//! HTTP fetch boundary: trait for dependency injection plus the reqwest
//! implementation.
//!
//! The fetcher streams response bodies chunk by chunk and re-checks the
//! shared cancellation token at every await point, so a cancelled batch
//! stops pulling bytes mid-body instead of draining the response.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::FetchError;

/// Best-effort cancellable byte fetch.
///
/// Implementations must observe `cancel` at each await point: once the
/// token fires, no further progress is made and [`FetchError::Cancelled`]
/// is returned.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetches the full body at `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] describing the failure; cancellation is
    /// reported as [`FetchError::Cancelled`], never as a network error.
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError>;
}

/// [`HttpFetcher`] backed by a pooled reqwest client.
///
/// Designed to be created once and shared; connection pooling makes
/// sequential fetches against the same host cheap.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestFetcher {
    /// Creates a fetcher with default timeouts (30s connect, 2min read).
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a fetcher with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .timeout(std::time::Duration::from_secs(read_timeout_secs))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    #[instrument(level = "debug", skip(self, cancel))]
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::cancelled(url));
        }

        let parsed = Url::parse(url).map_err(|_| FetchError::invalid_url(url))?;

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(FetchError::cancelled(url)),
            result = self.client.get(parsed).send() => {
                result.map_err(|e| map_transport_error(url, e))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::http_status(url, status.as_u16()));
        }

        let mut bytes = Vec::with_capacity(
            response
                .content_length()
                .and_then(|len| usize::try_from(len).ok())
                .unwrap_or(0),
        );
        let mut stream = response.bytes_stream();
        loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(FetchError::cancelled(url)),
                chunk = stream.next() => chunk,
            };
            match chunk {
                Some(Ok(data)) => bytes.extend_from_slice(&data),
                Some(Err(e)) => return Err(map_transport_error(url, e)),
                None => break,
            }
        }

        debug!(url, bytes = bytes.len(), "fetch complete");
        Ok(bytes)
    }
}

fn map_transport_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::timeout(url)
    } else {
        FetchError::network(url, error)
    }
}
