//! Error types for the fetch module.
//!
//! Cancellation is a distinct error kind, always distinguishable from
//! network failure: its display message contains the word "cancelled".

use thiserror::Error;

/// Errors that can occur while fetching a single URL.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS resolution, connection refused, TLS, etc.)
    #[error("network error fetching {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout fetching {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The shared cancellation signal fired before or during the fetch.
    #[error("fetch cancelled: {url}")]
    Cancelled {
        /// The URL whose fetch was cancelled.
        url: String,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },
}

impl FetchError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a cancellation error.
    pub fn cancelled(url: impl Into<String>) -> Self {
        Self::Cancelled { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Returns true when this error came from the cancellation signal.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether a retry could plausibly succeed.
    ///
    /// | Error | Retryable | Rationale |
    /// |-------|-----------|-----------|
    /// | Timeout | yes | Network may recover |
    /// | Network | yes | Server may come back |
    /// | HTTP 408 / 429 | yes | Timeout / rate limiting are temporary |
    /// | HTTP 5xx | yes | Server error may be temporary |
    /// | Other HTTP 4xx | no | Request will not improve on retry |
    /// | Cancelled | no | The batch was told to stop |
    /// | InvalidUrl | no | Malformed input |
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::HttpStatus { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            Self::Cancelled { .. } | Self::InvalidUrl { .. } => false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_display_mentions_cancellation() {
        let error = FetchError::cancelled("https://example.com/a.jpg");
        let msg = error.to_string();
        assert!(msg.contains("cancelled"), "got: {msg}");
        assert!(msg.contains("https://example.com/a.jpg"), "got: {msg}");
    }

    #[test]
    fn test_http_status_display() {
        let error = FetchError::http_status("https://example.com/a.jpg", 404);
        let msg = error.to_string();
        assert!(msg.contains("404"), "got: {msg}");
        assert!(msg.contains("https://example.com/a.jpg"), "got: {msg}");
    }

    #[test]
    fn test_cancellation_distinguishable_from_network_failure() {
        let cancelled = FetchError::cancelled("https://example.com/a");
        let timeout = FetchError::timeout("https://example.com/a");
        assert!(cancelled.is_cancelled());
        assert!(!timeout.is_cancelled());
        assert!(!timeout.to_string().contains("cancelled"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::timeout("u").is_retryable());
        assert!(FetchError::http_status("u", 500).is_retryable());
        assert!(FetchError::http_status("u", 503).is_retryable());
        assert!(FetchError::http_status("u", 429).is_retryable());
        assert!(FetchError::http_status("u", 408).is_retryable());

        assert!(!FetchError::http_status("u", 404).is_retryable());
        assert!(!FetchError::http_status("u", 400).is_retryable());
        assert!(!FetchError::http_status("u", 403).is_retryable());
        assert!(!FetchError::cancelled("u").is_retryable());
        assert!(!FetchError::invalid_url("u").is_retryable());
    }
}
