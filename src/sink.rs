//! Download sink boundary: where fetched bytes ultimately land.
//!
//! The platform mechanism for persisting a blob may be absent (no writable
//! target directory, sandboxed environment). That is a capability condition
//! callers probe with [`DownloadSink::availability`] before starting a
//! batch, not a crash at save time.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::archive::filename::{sanitize_filename, split_stem_ext};

/// Errors produced by a download sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink cannot accept saves at all.
    #[error("download sink unavailable: {reason}")]
    Unavailable {
        /// Human-readable reason the sink cannot proceed.
        reason: String,
    },

    /// File system error while persisting.
    #[error("IO error writing {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SinkError {
    /// Creates an unavailability error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Persistence boundary for fetched bytes.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Checks whether the sink can accept saves.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Unavailable`] with a human-readable reason when
    /// the capability is absent.
    fn availability(&self) -> Result<(), SinkError>;

    /// Persists `bytes` under `filename`.
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] when the write fails.
    async fn save(&self, bytes: &[u8], filename: &str) -> Result<(), SinkError>;
}

/// Sink writing files beneath a target directory.
///
/// Filenames are sanitized for filesystem safety; a name already present on
/// disk gets a ` (n)` disambiguator before the extension.
#[derive(Debug, Clone)]
pub struct FsSink {
    dir: PathBuf,
}

impl FsSink {
    /// Creates a sink rooted at `dir`. The directory is probed lazily via
    /// [`DownloadSink::availability`], not at construction.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the target directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Picks an on-disk path that does not collide with an existing file.
    fn unique_path(&self, filename: &str) -> PathBuf {
        let base = self.dir.join(filename);
        if !base.exists() {
            return base;
        }

        let (stem, ext) = split_stem_ext(filename);
        for i in 1..1000 {
            let candidate = self.dir.join(format!("{stem} ({i}){ext}"));
            if !candidate.exists() {
                return candidate;
            }
        }
        // Practically unreachable; surface the collision rather than loop on.
        base
    }
}

#[async_trait]
impl DownloadSink for FsSink {
    fn availability(&self) -> Result<(), SinkError> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(SinkError::unavailable(format!(
                "target directory {} does not exist",
                self.dir.display()
            )))
        }
    }

    #[instrument(level = "debug", skip(self, bytes), fields(bytes = bytes.len()))]
    async fn save(&self, bytes: &[u8], filename: &str) -> Result<(), SinkError> {
        let safe_name = {
            let sanitized = sanitize_filename(filename);
            if sanitized.trim_matches('_').is_empty() {
                "download.bin".to_string()
            } else {
                sanitized
            }
        };
        let path = self.unique_path(&safe_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| SinkError::io(&path, e))?;
        debug!(path = %path.display(), "saved");
        Ok(())
    }
}
