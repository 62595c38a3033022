//! Archive encoder boundary and the STORE-mode zip implementation.
//!
//! Media payloads (JPEG, PNG, MP4) are already compressed, so the default
//! encoder writes STORE (no-compression) zip entries: no CPU burned
//! re-deflating bytes that will not shrink.

use std::io::{Cursor, Write};

use thiserror::Error;
use tracing::{debug, instrument};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Errors produced while assembling an archive.
///
/// Encoding failure is fatal for the whole archive operation: a partially
/// written zip is not meaningful.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The zip writer rejected an entry or failed to finalize.
    #[error("zip encoding failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error on the in-memory buffer.
    #[error("IO error during archive assembly: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous, pure archive assembly from named byte buffers.
pub trait ArchiveEncoder: Send + Sync {
    /// Encodes `entries` into a single archive buffer. Entry names must
    /// already be unique; the encoder does not rename.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] when assembly fails. No partial output is
    /// returned.
    fn encode(&self, entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, EncodeError>;
}

/// [`ArchiveEncoder`] writing STORE-mode (uncompressed) zip archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreZipEncoder;

impl StoreZipEncoder {
    /// Creates a STORE-mode encoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ArchiveEncoder for StoreZipEncoder {
    #[instrument(level = "debug", skip_all, fields(entries = entries.len()))]
    fn encode(&self, entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, EncodeError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

        for (name, bytes) in entries {
            writer.start_file(name.as_str(), options)?;
            writer.write_all(bytes)?;
        }

        let cursor = writer.finish()?;
        let buffer = cursor.into_inner();
        debug!(bytes = buffer.len(), "archive encoded");
        Ok(buffer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Read;

    use super::*;

    fn entry(name: &str, bytes: &[u8]) -> (String, Vec<u8>) {
        (name.to_string(), bytes.to_vec())
    }

    #[test]
    fn test_encode_roundtrip_preserves_names_and_bytes() {
        let encoder = StoreZipEncoder::new();
        let archive = encoder
            .encode(&[entry("a.jpg", b"alpha"), entry("b.mp4", b"beta")])
            .unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 2);

        let mut names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.jpg", "b.mp4"]);

        let mut contents = Vec::new();
        zip.by_name("a.jpg").unwrap().read_to_end(&mut contents).unwrap();
        assert_eq!(contents, b"alpha");
    }

    #[test]
    fn test_encode_uses_store_method() {
        let encoder = StoreZipEncoder::new();
        let archive = encoder.encode(&[entry("a.jpg", b"payload")]).unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let file = zip.by_index(0).unwrap();
        assert_eq!(file.compression(), CompressionMethod::Stored);
    }

    #[test]
    fn test_encode_empty_set_yields_valid_empty_archive() {
        let encoder = StoreZipEncoder::new();
        let archive = encoder.encode(&[]).unwrap();

        let zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 0);
    }
}
