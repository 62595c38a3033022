//! Exponential backoff policy shared by the bulk fetch service and the
//! archive orchestrator.
//!
//! Delay formula: `min(base * 2^attempt, max) + jitter`, with `attempt`
//! counting completed failed attempts from zero. Jitter spreads retries of
//! simultaneously-failed fetches so they do not land on the server in
//! lockstep.

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::client::HttpFetcher;
use super::constants::{BACKOFF_BASE, BACKOFF_MAX, BACKOFF_MAX_JITTER};
use super::error::FetchError;

/// Configuration for retry delays.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    base_delay: Duration,
    /// Cap applied to the computed delay (jitter excluded).
    max_delay: Duration,
    /// Upper bound for random jitter added to each delay.
    max_jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: BACKOFF_BASE,
            max_delay: BACKOFF_MAX,
            max_jitter: BACKOFF_MAX_JITTER,
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with explicit delays.
    #[must_use]
    pub fn new(base_delay: Duration, max_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            max_jitter,
        }
    }

    /// Returns the configured base delay.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Computes the delay before retrying after `attempt` failed attempts
    /// (0-indexed: the first retry waits roughly the base delay).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let delay_ms = base_ms * 2f64.powi(i32::try_from(attempt.min(30)).unwrap_or(30));
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64) + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let bound = self.max_jitter.as_millis() as u64;
        if bound == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..=bound))
    }
}

/// Fetches `url`, retrying retryable failures up to `retries` additional
/// times with backoff. The backoff sleep races the cancellation token, so a
/// cancelled batch never sits out a delay.
///
/// `on_retry` is invoked with the failed-attempt count before each delay.
pub(crate) async fn fetch_with_retry(
    fetcher: &dyn HttpFetcher,
    url: &str,
    retries: u32,
    policy: &BackoffPolicy,
    token: &CancellationToken,
    mut on_retry: impl FnMut(u32) + Send,
) -> Result<Vec<u8>, FetchError> {
    let mut failed_attempts = 0u32;

    loop {
        match fetcher.fetch(url, token).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                failed_attempts += 1;
                if !e.is_retryable() || failed_attempts > retries {
                    return Err(e);
                }

                let delay = policy.delay_for(failed_attempts - 1);
                debug!(
                    url,
                    attempt = failed_attempts,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "retrying fetch"
                );
                on_retry(failed_attempts);
                tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(FetchError::cancelled(url)),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jitterless(base_ms: u64, max_ms: u64) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(base_ms),
            Duration::from_millis(max_ms),
            Duration::ZERO,
        )
    }

    #[test]
    fn test_default_base_is_two_hundred_millis() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base_delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_delay_doubles_per_attempt() {
        let policy = jitterless(200, 60_000);
        assert_eq!(policy.delay_for(0), Duration::from_millis(200));
        assert_eq!(policy.delay_for(1), Duration::from_millis(400));
        assert_eq!(policy.delay_for(2), Duration::from_millis(800));
        assert_eq!(policy.delay_for(3), Duration::from_millis(1600));
    }

    #[test]
    fn test_delay_respects_cap() {
        let policy = jitterless(200, 1000);
        assert_eq!(policy.delay_for(10), Duration::from_millis(1000));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let policy = jitterless(200, 5000);
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(5000));
    }

    #[test]
    fn test_jitter_within_bounds() {
        let policy = BackoffPolicy::default();
        for _ in 0..100 {
            let delay = policy.delay_for(0);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(300), "got {delay:?}");
        }
    }

    // ==================== fetch_with_retry ====================

    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    /// Fetcher that fails `failures_before_success` times, then succeeds.
    struct FlakyFetcher {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    impl FlakyFetcher {
        fn new(failures_before_success: u32) -> Self {
            Self {
                failures_before_success,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl HttpFetcher for FlakyFetcher {
        async fn fetch(
            &self,
            url: &str,
            _cancel: &CancellationToken,
        ) -> Result<Vec<u8>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                Err(FetchError::http_status(url, 503))
            } else {
                Ok(b"ok".to_vec())
            }
        }
    }

    #[tokio::test]
    async fn test_later_success_within_budget_counts_as_success() {
        let fetcher = FlakyFetcher::new(2);
        let policy = jitterless(1, 1);
        let bytes = fetch_with_retry(
            &fetcher,
            "https://example.com/a",
            2,
            &policy,
            &CancellationToken::new(),
            |_| {},
        )
        .await
        .unwrap();
        assert_eq!(bytes, b"ok");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_budget_exhaustion_returns_last_error() {
        let fetcher = FlakyFetcher::new(2);
        let policy = jitterless(1, 1);
        let result = fetch_with_retry(
            &fetcher,
            "https://example.com/a",
            1,
            &policy,
            &CancellationToken::new(),
            |_| {},
        )
        .await;
        assert!(matches!(result, Err(FetchError::HttpStatus { status: 503, .. })));
        // Initial attempt + one retry, no more.
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_on_retry_reports_attempt_numbers() {
        let fetcher = FlakyFetcher::new(2);
        let policy = jitterless(1, 1);
        let mut seen = Vec::new();
        fetch_with_retry(
            &fetcher,
            "https://example.com/a",
            3,
            &policy,
            &CancellationToken::new(),
            |attempt| seen.push(attempt),
        )
        .await
        .unwrap();
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        struct NotFoundFetcher {
            calls: AtomicU32,
        }
        #[async_trait]
        impl HttpFetcher for NotFoundFetcher {
            async fn fetch(
                &self,
                url: &str,
                _cancel: &CancellationToken,
            ) -> Result<Vec<u8>, FetchError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::http_status(url, 404))
            }
        }
        let not_found = NotFoundFetcher {
            calls: AtomicU32::new(0),
        };
        let policy = jitterless(1, 1);
        let result = fetch_with_retry(
            &not_found,
            "https://example.com/a",
            5,
            &policy,
            &CancellationToken::new(),
            |_| {},
        )
        .await;
        assert!(matches!(result, Err(FetchError::HttpStatus { status: 404, .. })));
        assert_eq!(not_found.calls.load(Ordering::SeqCst), 1);
    }
}
