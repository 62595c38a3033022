//! Download task record created at enqueue time.

use serde::{Deserialize, Serialize};

/// A single unit of download work. Created on enqueue, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTask {
    /// Unique identifier of this task within a session.
    pub task_id: String,
    /// Identifier of the media asset the task downloads.
    pub media_id: String,
    /// Filename the fetched bytes should be saved under.
    pub filename: String,
    /// URL to fetch.
    pub media_url: String,
}

impl DownloadTask {
    /// Creates a task record.
    #[must_use]
    pub fn new(
        task_id: impl Into<String>,
        media_id: impl Into<String>,
        filename: impl Into<String>,
        media_url: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            media_id: media_id.into(),
            filename: filename.into(),
            media_url: media_url.into(),
        }
    }
}
