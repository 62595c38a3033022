//! Bulk fetching: HTTP boundary, retry/backoff policy, and the
//! concurrency-bounded batch service.
//!
//! # Features
//!
//! - Semaphore-bounded concurrency with RAII permits
//! - Per-task retry with exponential backoff and jitter
//! - Shared cancellation token observed at every await point
//! - Aggregate results; individual failures never abort the batch
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mediagrab_core::fetch::{BulkFetchOptions, BulkFetchService, ReqwestFetcher};
//! use mediagrab_core::progress::ProgressSink;
//! use mediagrab_core::session::DownloadTask;
//! use mediagrab_core::sink::FsSink;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = BulkFetchService::new(
//!     Arc::new(ReqwestFetcher::new()),
//!     Arc::new(FsSink::new("./downloads")),
//! );
//! let tasks = vec![DownloadTask::new(
//!     "t1", "m1", "photo.jpg", "https://example.com/photo.jpg",
//! )];
//! let result = service
//!     .download_all(&tasks, &BulkFetchOptions::default(), &ProgressSink::disabled())
//!     .await?;
//! println!("{}/{} succeeded", result.files_successful, result.files_processed);
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
mod retry;
mod service;

pub(crate) use retry::fetch_with_retry;

pub use client::{HttpFetcher, ReqwestFetcher};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::FetchError;
pub use retry::BackoffPolicy;
pub use service::{
    BulkFetchError, BulkFetchOptions, BulkFetchResult, BulkFetchService, DEFAULT_CONCURRENCY,
    DEFAULT_RETRIES, TaskFailure,
};
