//! Bulk fetch service: concurrency-bounded, retryable, cancellable
//! execution of many download tasks.
//!
//! # Concurrency Model
//!
//! - Each task runs in its own Tokio task
//! - A semaphore permit is acquired before starting each fetch
//! - Permits are released automatically when tasks finish (RAII)
//! - Once cancellation is requested, no new fetch is started; queued tasks
//!   fail with the cancellation error kind, and in-flight fetches abort at
//!   their next await point

use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::client::HttpFetcher;
use super::retry::BackoffPolicy;
use crate::progress::{ProgressSink, TaskStatus};
use crate::session::DownloadTask;
use crate::sink::DownloadSink;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 64;

/// Default number of simultaneous fetches.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default number of additional attempts per task.
pub const DEFAULT_RETRIES: u32 = 0;

/// Error type for bulk fetch configuration.
///
/// Runtime conditions (failed fetches, cancellation, unavailable sinks)
/// never surface here; they are aggregated into [`BulkFetchResult`].
#[derive(Debug, thiserror::Error)]
pub enum BulkFetchError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Per-batch tuning for [`BulkFetchService::download_all`].
#[derive(Debug, Clone)]
pub struct BulkFetchOptions {
    /// Maximum simultaneous fetches (1-64).
    pub concurrency: usize,
    /// Additional attempts per task after the first failure.
    pub retries: u32,
    /// External cancellation signal; the service links its own run token to
    /// it so either side can stop the batch.
    pub cancel: Option<CancellationToken>,
}

impl Default for BulkFetchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retries: DEFAULT_RETRIES,
            cancel: None,
        }
    }
}

/// One failed task in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Id of the failed task.
    pub task_id: String,
    /// Final error message after the retry budget was exhausted.
    pub error: String,
}

/// Aggregate outcome of a batch.
#[derive(Debug, Clone)]
pub struct BulkFetchResult {
    /// True when every processed task succeeded.
    pub success: bool,
    /// Number of tasks in the batch.
    pub files_processed: usize,
    /// Number of tasks that completed successfully.
    pub files_successful: usize,
    /// Per-task failures, in batch order.
    pub failures: Vec<TaskFailure>,
    /// Batch-level error (cancellation, unavailable sink), if any.
    pub error: Option<String>,
}

/// Executes batches of download tasks against an [`HttpFetcher`], saving
/// results through a [`DownloadSink`].
pub struct BulkFetchService {
    fetcher: Arc<dyn HttpFetcher>,
    sink: Arc<dyn DownloadSink>,
    policy: BackoffPolicy,
    current: Mutex<Option<CancellationToken>>,
}

impl std::fmt::Debug for BulkFetchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkFetchService")
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl BulkFetchService {
    /// Creates a service with the default backoff policy.
    #[must_use]
    pub fn new(fetcher: Arc<dyn HttpFetcher>, sink: Arc<dyn DownloadSink>) -> Self {
        Self::with_policy(fetcher, sink, BackoffPolicy::default())
    }

    /// Creates a service with an explicit backoff policy.
    #[must_use]
    pub fn with_policy(
        fetcher: Arc<dyn HttpFetcher>,
        sink: Arc<dyn DownloadSink>,
        policy: BackoffPolicy,
    ) -> Self {
        Self {
            fetcher,
            sink,
            policy,
            current: Mutex::new(None),
        }
    }

    /// Cancels the batch currently in flight, if any.
    ///
    /// [`Self::is_busy`] returns false immediately afterwards, even while
    /// in-flight fetches are still unwinding.
    pub fn cancel(&self) {
        let guard = self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(token) = guard.as_ref() {
            info!("cancelling bulk fetch batch");
            token.cancel();
        }
    }

    /// Returns true while a batch is running and not cancelled.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    /// Executes all `tasks`, bounding concurrency and retrying failures.
    ///
    /// Individual failures do NOT fail the batch call; they are aggregated
    /// into the result. The aggregate `success` flag is true exactly when
    /// every processed task succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`BulkFetchError::InvalidConcurrency`] for a malformed
    /// configuration. Every runtime condition is reported in the result.
    #[instrument(skip_all, fields(task_count = tasks.len(), concurrency = options.concurrency))]
    pub async fn download_all(
        &self,
        tasks: &[DownloadTask],
        options: &BulkFetchOptions,
        progress: &ProgressSink,
    ) -> Result<BulkFetchResult, BulkFetchError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&options.concurrency) {
            return Err(BulkFetchError::InvalidConcurrency {
                value: options.concurrency,
            });
        }

        let token = options
            .cancel
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        self.set_current(Some(token.clone()));

        let result = self.run_batch(tasks, options, progress, &token).await;

        self.set_current(None);
        Ok(result)
    }

    async fn run_batch(
        &self,
        tasks: &[DownloadTask],
        options: &BulkFetchOptions,
        progress: &ProgressSink,
        token: &CancellationToken,
    ) -> BulkFetchResult {
        if let Err(e) = self.sink.availability() {
            warn!(error = %e, "refusing batch: sink unavailable");
            return BulkFetchResult {
                success: false,
                files_processed: tasks.len(),
                files_successful: 0,
                failures: Vec::new(),
                error: Some(e.to_string()),
            };
        }

        info!("starting bulk fetch batch");
        let semaphore = Arc::new(Semaphore::new(options.concurrency));
        let mut handles = Vec::with_capacity(tasks.len());

        for task in tasks {
            let task = task.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let sink = Arc::clone(&self.sink);
            let policy = self.policy.clone();
            let semaphore = Arc::clone(&semaphore);
            let token = token.clone();
            let progress = progress.clone();
            let retries = options.retries;

            handles.push(tokio::spawn(async move {
                // No new fetch may start after cancellation; tasks still
                // waiting for a permit fail with the cancellation kind.
                let permit = tokio::select! {
                    biased;
                    () = token.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    return Err(TaskFailure {
                        error: super::error::FetchError::cancelled(&task.media_url).to_string(),
                        task_id: task.task_id,
                    });
                };

                fetch_one_with_retry(&*fetcher, &*sink, &task, retries, &policy, &token, &progress)
                    .await
            }));
        }

        let files_processed = tasks.len();
        let mut files_successful = 0;
        let mut failures = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => files_successful += 1,
                Ok(Err(failure)) => failures.push(failure),
                Err(e) => {
                    // Task panics are recorded, not propagated.
                    warn!(error = %e, "fetch task panicked");
                    failures.push(TaskFailure {
                        task_id: String::new(),
                        error: format!("fetch task panicked: {e}"),
                    });
                }
            }
        }

        let success = files_successful == files_processed;
        let error = (token.is_cancelled() && !success).then(|| "download cancelled".to_string());
        info!(
            files_successful,
            files_processed,
            failed = failures.len(),
            cancelled = token.is_cancelled(),
            "bulk fetch batch complete"
        );

        BulkFetchResult {
            success,
            files_processed,
            files_successful,
            failures,
            error,
        }
    }

    fn set_current(&self, token: Option<CancellationToken>) {
        *self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }
}

/// Fetches one task with retry, then persists it through the sink.
///
/// Sink write failures are permanent (retrying the fetch would not help).
async fn fetch_one_with_retry(
    fetcher: &dyn HttpFetcher,
    sink: &dyn DownloadSink,
    task: &DownloadTask,
    retries: u32,
    policy: &BackoffPolicy,
    token: &CancellationToken,
    progress: &ProgressSink,
) -> Result<(), TaskFailure> {
    progress.task(&task.task_id, TaskStatus::Started);

    let fetched = super::retry::fetch_with_retry(
        fetcher,
        &task.media_url,
        retries,
        policy,
        token,
        |_attempt| progress.task(&task.task_id, TaskStatus::Retrying),
    )
    .await;

    match fetched {
        Ok(bytes) => match sink.save(&bytes, &task.filename).await {
            Ok(()) => {
                progress.task(&task.task_id, TaskStatus::Completed);
                Ok(())
            }
            Err(e) => {
                warn!(task_id = %task.task_id, error = %e, "sink write failed");
                progress.task(&task.task_id, TaskStatus::Failed);
                Err(TaskFailure {
                    task_id: task.task_id.clone(),
                    error: e.to_string(),
                })
            }
        },
        Err(e) => {
            debug!(task_id = %task.task_id, error = %e, "task failed");
            progress.task(&task.task_id, TaskStatus::Failed);
            Err(TaskFailure {
                task_id: task.task_id.clone(),
                error: e.to_string(),
            })
        }
    }
}
