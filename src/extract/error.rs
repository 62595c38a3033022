//! Error types for the extraction pipeline.

use thiserror::Error;

/// Input errors reported by the extraction pipeline.
///
/// Runtime conditions (unparseable URLs, blocked hosts, candidates without
/// sources) are filtered stage-by-stage and never surface here; only an
/// unusable document root fails the pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The provided root node cannot anchor an extraction walk.
    #[error("invalid document root: {reason}")]
    InvalidRoot {
        /// Why the root was rejected.
        reason: &'static str,
    },
}

impl ExtractError {
    /// Creates an invalid-root error.
    #[must_use]
    pub fn invalid_root(reason: &'static str) -> Self {
        Self::InvalidRoot { reason }
    }
}
