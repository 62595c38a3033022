//! Archive orchestrator: fetch a batch of remote items, resolve filename
//! collisions, and assemble the survivors into a single archive buffer.
//!
//! The orchestrator is a long-lived service with an explicit
//! `initialize()` / `destroy()` lifecycle. `destroy()` cancels any pending
//! backoff timers together with flipping the initialized flag, so a torn
//! down orchestrator never leaves sleeps running in the background.
//!
//! Partial failure is the normal case, not an error: items that cannot be
//! fetched are recorded in `failures` and the archive is produced from
//! whatever succeeded. Only archive encoding is all-or-nothing.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mediagrab_core::archive::{
//!     ArchiveItem, ArchiveOptions, ArchiveOrchestrator, StoreZipEncoder,
//! };
//! use mediagrab_core::fetch::ReqwestFetcher;
//! use mediagrab_core::progress::ProgressSink;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = ArchiveOrchestrator::new(
//!     Arc::new(ReqwestFetcher::new()),
//!     Arc::new(StoreZipEncoder::new()),
//! );
//! orchestrator.initialize();
//! let items = vec![ArchiveItem::new("https://example.com/a.jpg", "a.jpg")];
//! let result = orchestrator
//!     .archive_items(&items, &ArchiveOptions::default(), &ProgressSink::disabled())
//!     .await?;
//! println!("{} files archived", result.files_successful);
//! orchestrator.destroy();
//! # Ok(())
//! # }
//! ```

mod encoder;
mod error;
pub(crate) mod filename;

pub use encoder::{ArchiveEncoder, EncodeError, StoreZipEncoder};
pub use error::ArchiveError;

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::fetch::{BackoffPolicy, DEFAULT_CONCURRENCY, FetchError, HttpFetcher, fetch_with_retry};
use crate::progress::{ProgressSink, TaskStatus};

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 64;

/// Default number of additional attempts per archive item.
pub const DEFAULT_ARCHIVE_RETRIES: u32 = 2;

/// One remote item to include in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveItem {
    /// URL to fetch.
    pub url: String,
    /// Desired filename inside the archive. When empty, a name is derived
    /// from the URL path.
    pub desired_name: String,
}

impl ArchiveItem {
    /// Creates an archive item.
    #[must_use]
    pub fn new(url: impl Into<String>, desired_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            desired_name: desired_name.into(),
        }
    }
}

/// One item that could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFailure {
    /// URL of the failed item.
    pub url: String,
    /// Final error message.
    pub error: String,
}

/// Outcome of an archive batch.
///
/// Invariant: `used_filenames` contains no duplicates and its length
/// equals `files_successful`.
#[derive(Debug, Clone)]
pub struct ArchiveResult {
    /// Number of items fetched and included in the archive.
    pub files_successful: usize,
    /// Items excluded from the archive, in batch order.
    pub failures: Vec<ArchiveFailure>,
    /// The encoded archive buffer.
    pub zip_data: Vec<u8>,
    /// Final in-archive filenames, in batch order of the successful items.
    pub used_filenames: Vec<String>,
}

/// Per-batch tuning for [`ArchiveOrchestrator::archive_items`].
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Maximum simultaneous fetches (1-64).
    pub concurrency: usize,
    /// Additional attempts per item after the first failure.
    pub retries: u32,
    /// External cancellation signal for this batch.
    pub cancel: Option<CancellationToken>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retries: DEFAULT_ARCHIVE_RETRIES,
            cancel: None,
        }
    }
}

/// Lifecycle state guarded by one lock so `destroy()` cancels timers and
/// flips the flag atomically.
#[derive(Debug)]
struct Lifecycle {
    initialized: bool,
    shutdown: CancellationToken,
}

/// Fetches batches of remote items and packages them into archives.
pub struct ArchiveOrchestrator {
    fetcher: Arc<dyn HttpFetcher>,
    encoder: Arc<dyn ArchiveEncoder>,
    policy: BackoffPolicy,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for ArchiveOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveOrchestrator")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl ArchiveOrchestrator {
    /// Creates an orchestrator with the default backoff policy. Call
    /// [`Self::initialize`] before archiving.
    #[must_use]
    pub fn new(fetcher: Arc<dyn HttpFetcher>, encoder: Arc<dyn ArchiveEncoder>) -> Self {
        Self::with_policy(fetcher, encoder, BackoffPolicy::default())
    }

    /// Creates an orchestrator with an explicit backoff policy.
    #[must_use]
    pub fn with_policy(
        fetcher: Arc<dyn HttpFetcher>,
        encoder: Arc<dyn ArchiveEncoder>,
        policy: BackoffPolicy,
    ) -> Self {
        Self {
            fetcher,
            encoder,
            policy,
            lifecycle: Mutex::new(Lifecycle {
                initialized: false,
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Brings the service up. Idempotent: initializing twice is a no-op.
    pub fn initialize(&self) {
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.initialized {
            return;
        }
        lifecycle.shutdown = CancellationToken::new();
        lifecycle.initialized = true;
        info!("archive orchestrator initialized");
    }

    /// Tears the service down, cancelling pending backoff timers. Idempotent:
    /// destroying twice is a no-op.
    pub fn destroy(&self) {
        let mut lifecycle = self.lock_lifecycle();
        if !lifecycle.initialized {
            return;
        }
        lifecycle.shutdown.cancel();
        lifecycle.initialized = false;
        info!("archive orchestrator destroyed");
    }

    /// Returns whether the service is currently initialized.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock_lifecycle().initialized
    }

    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn shutdown_token(&self) -> Option<CancellationToken> {
        let lifecycle = self.lock_lifecycle();
        lifecycle.initialized.then(|| lifecycle.shutdown.clone())
    }

    /// Fetches every item, resolves filename collisions, and encodes the
    /// successful payloads into one archive.
    ///
    /// Empty input yields an empty, valid archive result. Cancellation
    /// mid-batch records the unfetched items as failures and still encodes
    /// whatever succeeded.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::NotInitialized`] when called outside the
    ///   `initialize()`/`destroy()` window
    /// - [`ArchiveError::InvalidConcurrency`] for a malformed configuration
    /// - [`ArchiveError::Encode`] when archive assembly fails
    #[instrument(skip_all, fields(item_count = items.len(), concurrency = options.concurrency))]
    pub async fn archive_items(
        &self,
        items: &[ArchiveItem],
        options: &ArchiveOptions,
        progress: &ProgressSink,
    ) -> Result<ArchiveResult, ArchiveError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&options.concurrency) {
            return Err(ArchiveError::InvalidConcurrency {
                value: options.concurrency,
            });
        }
        let Some(shutdown) = self.shutdown_token() else {
            return Err(ArchiveError::NotInitialized);
        };

        // The run token trips when either the caller's signal or destroy()
        // fires; every fetch and backoff sleep races against it.
        let run = CancellationToken::new();
        if shutdown.is_cancelled()
            || options
                .cancel
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
        {
            run.cancel();
        }
        let watcher = tokio::spawn(forward_cancellation(
            run.clone(),
            shutdown,
            options.cancel.clone(),
        ));

        info!("starting archive batch");
        let payloads = self.fetch_all(items, options, progress, &run).await;
        watcher.abort();

        let mut failures = Vec::new();
        let mut used = HashSet::new();
        let mut used_filenames = Vec::new();
        let mut entries = Vec::new();

        // Assemble in input order so collision numbering is deterministic.
        for (item, payload) in items.iter().zip(payloads) {
            match payload {
                Ok(bytes) => {
                    let name = filename::resolve_collision(&desired_name(item), &mut used);
                    used_filenames.push(name.clone());
                    entries.push((name, bytes));
                }
                Err(error) => {
                    failures.push(ArchiveFailure {
                        url: item.url.clone(),
                        error,
                    });
                }
            }
        }

        let zip_data = self.encoder.encode(&entries).map_err(ArchiveError::encode)?;
        info!(
            files_successful = entries.len(),
            failed = failures.len(),
            zip_bytes = zip_data.len(),
            "archive batch complete"
        );

        Ok(ArchiveResult {
            files_successful: used_filenames.len(),
            failures,
            zip_data,
            used_filenames,
        })
    }

    /// Fetch phase: permit-bounded, retrying, cancellable. Returns one
    /// result per item, in item order.
    async fn fetch_all(
        &self,
        items: &[ArchiveItem],
        options: &ArchiveOptions,
        progress: &ProgressSink,
        run: &CancellationToken,
    ) -> Vec<Result<Vec<u8>, String>> {
        let semaphore = Arc::new(Semaphore::new(options.concurrency));
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            let url = item.url.clone();
            let fetcher = Arc::clone(&self.fetcher);
            let policy = self.policy.clone();
            let semaphore = Arc::clone(&semaphore);
            let token = run.clone();
            let progress = progress.clone();
            let retries = options.retries;

            handles.push(tokio::spawn(async move {
                let permit = tokio::select! {
                    biased;
                    () = token.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                if permit.is_none() {
                    return Err(FetchError::cancelled(&url).to_string());
                }

                progress.task(&url, TaskStatus::Started);
                let result = fetch_with_retry(&*fetcher, &url, retries, &policy, &token, |_| {
                    progress.task(&url, TaskStatus::Retrying);
                })
                .await;

                match result {
                    Ok(bytes) => {
                        progress.task(&url, TaskStatus::Completed);
                        Ok(bytes)
                    }
                    Err(e) => {
                        debug!(url, error = %e, "archive item failed");
                        progress.task(&url, TaskStatus::Failed);
                        Err(e.to_string())
                    }
                }
            }));
        }

        let mut payloads = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => payloads.push(result),
                Err(e) => {
                    warn!(error = %e, "archive fetch task panicked");
                    payloads.push(Err(format!("archive fetch task panicked: {e}")));
                }
            }
        }
        payloads
    }
}

/// Cancels `run` when either parent token fires; exits quietly once the
/// run itself is cancelled or the watcher is aborted.
async fn forward_cancellation(
    run: CancellationToken,
    shutdown: CancellationToken,
    external: Option<CancellationToken>,
) {
    match external {
        Some(external) => tokio::select! {
            () = shutdown.cancelled() => run.cancel(),
            () = external.cancelled() => run.cancel(),
            () = run.cancelled() => {}
        },
        None => tokio::select! {
            () = shutdown.cancelled() => run.cancel(),
            () = run.cancelled() => {}
        },
    }
}

/// Sanitized in-archive name for an item, derived from the URL when no
/// desired name was provided.
fn desired_name(item: &ArchiveItem) -> String {
    let sanitized = filename::sanitize_filename(&item.desired_name);
    if !item.desired_name.is_empty() && !sanitized.trim_matches('_').is_empty() {
        return sanitized;
    }
    filename::filename_from_url(&item.url).unwrap_or_else(|| "download.bin".to_string())
}
