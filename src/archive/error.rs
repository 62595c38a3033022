//! Error types for the archive orchestrator.

use thiserror::Error;

use super::encoder::EncodeError;

/// Errors returned by [`crate::archive::ArchiveOrchestrator`].
///
/// Per-item fetch failures are NOT errors; they are recorded in the result
/// and the archive is built from whatever succeeded.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The orchestrator was used before `initialize()` or after
    /// `destroy()`.
    #[error("archive service not initialized")]
    NotInitialized,

    /// Invalid concurrency value provided.
    #[error("invalid concurrency value {value}: must be between 1 and 64")]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Archive assembly failed; no partial archive is meaningful.
    #[error("archive encoding failed: {source}")]
    Encode {
        /// The underlying encoder error.
        #[source]
        source: EncodeError,
    },
}

impl ArchiveError {
    /// Wraps an encoder failure.
    #[must_use]
    pub fn encode(source: EncodeError) -> Self {
        Self::Encode { source }
    }
}
