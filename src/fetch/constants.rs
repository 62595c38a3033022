//! Constants for the fetch module (timeouts, retry defaults).

use std::time::Duration;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (2 minutes; media files, not bulk data sets).
pub const READ_TIMEOUT_SECS: u64 = 120;

/// Base delay for exponential retry backoff (200 milliseconds).
pub const BACKOFF_BASE: Duration = Duration::from_millis(200);

/// Cap applied to backoff delays (10 seconds).
pub const BACKOFF_MAX: Duration = Duration::from_secs(10);

/// Maximum jitter added to backoff delays (100 milliseconds).
pub const BACKOFF_MAX_JITTER: Duration = Duration::from_millis(100);
