//! Optional progress/telemetry callbacks for extraction and transfers.
//!
//! Consumers may want stage counts during extraction and per-task status
//! during bulk/archive operations. Both callbacks are optional capabilities:
//! a panicking callback is caught and logged, never allowed to abort the
//! pipeline that invoked it.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

/// Per-task status reported during bulk fetch and archive operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task's first fetch attempt has started.
    Started,
    /// A failed attempt is being retried.
    Retrying,
    /// The task finished successfully.
    Completed,
    /// The task failed after exhausting its retry budget.
    Failed,
}

impl TaskStatus {
    /// Returns the reporting string for this status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Retrying => "retrying",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

type StageCallback = dyn Fn(&str, usize) + Send + Sync;
type TaskCallback = dyn Fn(&str, TaskStatus) + Send + Sync;

/// Observer handle passed into the extraction pipeline and fetch services.
///
/// Both callbacks default to absent and are held behind `Arc`, so cloning a
/// sink (to hand per-task copies to spawned workers) is cheap. Use
/// [`ProgressSink::disabled`] when no reporting is wanted.
#[derive(Default, Clone)]
pub struct ProgressSink {
    on_stage: Option<Arc<StageCallback>>,
    on_task: Option<Arc<TaskCallback>>,
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressSink")
            .field("on_stage", &self.on_stage.is_some())
            .field("on_task", &self.on_task.is_some())
            .finish()
    }
}

impl ProgressSink {
    /// Creates a sink that reports nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Sets the callback invoked with `(stage_name, item_count)` after each
    /// extraction stage.
    #[must_use]
    pub fn with_stage_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, usize) + Send + Sync + 'static,
    {
        self.on_stage = Some(Arc::new(callback));
        self
    }

    /// Sets the callback invoked with `(task_id, status)` during bulk fetch
    /// and archive operations.
    #[must_use]
    pub fn with_task_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str, TaskStatus) + Send + Sync + 'static,
    {
        self.on_task = Some(Arc::new(callback));
        self
    }

    /// Reports a completed extraction stage. Callback panics are swallowed.
    pub(crate) fn stage(&self, name: &str, count: usize) {
        if let Some(callback) = &self.on_stage
            && catch_unwind(AssertUnwindSafe(|| callback(name, count))).is_err()
        {
            warn!(stage = name, "progress stage callback panicked; ignoring");
        }
    }

    /// Reports a task status change. Callback panics are swallowed.
    pub(crate) fn task(&self, task_id: &str, status: TaskStatus) {
        if let Some(callback) = &self.on_task
            && catch_unwind(AssertUnwindSafe(|| callback(task_id, status))).is_err()
        {
            warn!(task_id, %status, "progress task callback panicked; ignoring");
        }
    }
}
