//! Mediagrab Core Library
//!
//! This library provides the core functionality for extracting media
//! references from a document fragment, tracking a download session, and
//! retrieving the referenced media under bounded concurrency with retry,
//! cancellation, and optional archive packaging.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`extract`] - Pure pipeline turning a DOM subtree into media descriptors
//! - [`session`] - Pure state machine tracking a logical download session
//! - [`fetch`] - Concurrency-bounded, retryable, cancellable bulk fetching
//! - [`archive`] - Batch fetch + filename collision resolution + zip assembly
//! - [`sink`] - Download sink boundary for persisting fetched bytes
//! - [`progress`] - Optional progress/telemetry callbacks; panics are contained

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod archive;
pub mod extract;
pub mod fetch;
pub mod progress;
pub mod session;
pub mod sink;

// Re-export commonly used types
pub use archive::{
    ArchiveEncoder, ArchiveError, ArchiveFailure, ArchiveItem, ArchiveOptions, ArchiveOrchestrator,
    ArchiveResult, EncodeError, StoreZipEncoder,
};
pub use extract::{
    DomNode, ExtractError, ExtractOptions, MediaDescriptor, MediaKind, MediaVariant,
    VariantQuality, extract_media,
};
pub use fetch::{
    BackoffPolicy, BulkFetchError, BulkFetchOptions, BulkFetchResult, BulkFetchService,
    DEFAULT_CONCURRENCY, FetchError, HttpFetcher, ReqwestFetcher, TaskFailure,
};
pub use progress::{ProgressSink, TaskStatus};
pub use session::{Action, DownloadState, DownloadTask, SessionStatus, Transition, transition};
pub use sink::{DownloadSink, FsSink, SinkError};
