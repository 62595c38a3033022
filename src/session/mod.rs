//! Pure state machine tracking a logical download session.
//!
//! The session state is an immutable value shared as `Arc<DownloadState>`.
//! Every action goes through [`transition`], which returns a new state plus
//! a report; invalid or no-op actions hand back a pointer-equal clone of
//! the input `Arc` so callers can skip resynchronization via
//! [`Arc::ptr_eq`]. The reducer never blocks and holds no ambient state;
//! concurrent transitions on one session require external serialization.

mod task;

pub use task::DownloadTask;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Session-level status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Nothing queued or running.
    Idle,
    /// Work is queued but nothing has started yet.
    Queued,
    /// A task is actively downloading.
    Processing,
    /// The last task failed and the queue drained.
    Error,
}

impl SessionStatus {
    /// Returns the canonical string representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable download session state.
///
/// Invariants maintained by the reducer:
/// - `active_task` is non-null whenever `status` is `Processing`;
/// - `queue` never contains the active task;
/// - counts only grow, except through `Reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadState {
    /// Session-level status.
    pub status: SessionStatus,
    /// Task ids waiting to start, in enqueue order.
    pub queue: Vec<String>,
    /// Task id currently downloading, if any.
    pub active_task: Option<String>,
    /// Number of tasks completed successfully.
    pub completed_count: u64,
    /// Number of tasks that failed.
    pub failed_count: u64,
    /// Error message from the most recent failure, cleared on success.
    pub error: Option<String>,
}

impl DownloadState {
    /// Creates the initial (idle, empty) session state.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            status: SessionStatus::Idle,
            queue: Vec::new(),
            active_task: None,
            completed_count: 0,
            failed_count: 0,
            error: None,
        }
    }
}

impl Default for DownloadState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Actions accepted by the session reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Append a task to the queue unless its id is already queued or active.
    Enqueue(DownloadTask),
    /// Promote a queued task to active.
    Start {
        /// Id of the task to start; must be present in the queue.
        task_id: String,
    },
    /// Record successful completion of the active task.
    Complete {
        /// Id of the task that finished; must equal the active task.
        task_id: String,
    },
    /// Record failure of the active task.
    Fail {
        /// Id of the task that failed; must equal the active task.
        task_id: String,
        /// Failure description stored in the session state.
        error: String,
    },
    /// Drop all queued work. The active task, if any, still reports its own
    /// outcome.
    Cancel,
    /// Return to the initial state, discarding all counts.
    Reset,
}

/// Result of applying an action to a session state.
#[derive(Debug, Clone)]
pub struct Transition {
    /// The state after the action. Pointer-equal to the input for invalid
    /// and no-op actions.
    pub state: Arc<DownloadState>,
    /// Whether the action was applicable to the input state.
    pub is_valid: bool,
    /// Set when an enqueue was ignored because the task id already exists.
    pub is_duplicate: bool,
    /// Whether the state value changed and observers should resync.
    pub should_sync: bool,
}

/// Applies an action to a session state.
///
/// Total over all `(state, action)` pairs: inapplicable actions return
/// `is_valid = false` with the original `Arc` unchanged instead of
/// panicking or erroring.
#[must_use]
pub fn transition(state: &Arc<DownloadState>, action: &Action) -> Transition {
    match action {
        Action::Enqueue(task) => enqueue(state, task),
        Action::Start { task_id } => start(state, task_id),
        Action::Complete { task_id } => complete(state, task_id),
        Action::Fail { task_id, error } => fail(state, task_id, error),
        Action::Cancel => cancel(state),
        Action::Reset => reset(state),
    }
}

fn unchanged(state: &Arc<DownloadState>, is_valid: bool, is_duplicate: bool) -> Transition {
    Transition {
        state: Arc::clone(state),
        is_valid,
        is_duplicate,
        should_sync: false,
    }
}

fn changed(next: DownloadState) -> Transition {
    Transition {
        state: Arc::new(next),
        is_valid: true,
        is_duplicate: false,
        should_sync: true,
    }
}

fn enqueue(state: &Arc<DownloadState>, task: &DownloadTask) -> Transition {
    let id = &task.task_id;
    let already_known = state.queue.iter().any(|q| q == id)
        || state.active_task.as_deref() == Some(id.as_str());
    if already_known {
        trace!(task_id = %id, "duplicate enqueue ignored");
        return unchanged(state, true, true);
    }

    let mut next = (**state).clone();
    next.queue.push(id.clone());
    if matches!(next.status, SessionStatus::Idle | SessionStatus::Error) {
        next.status = SessionStatus::Queued;
    }
    changed(next)
}

fn start(state: &Arc<DownloadState>, task_id: &str) -> Transition {
    let Some(position) = state.queue.iter().position(|q| q == task_id) else {
        trace!(task_id, "start rejected: task not queued");
        return unchanged(state, false, false);
    };

    let mut next = (**state).clone();
    next.queue.remove(position);
    next.active_task = Some(task_id.to_string());
    next.status = SessionStatus::Processing;
    changed(next)
}

fn complete(state: &Arc<DownloadState>, task_id: &str) -> Transition {
    if state.active_task.as_deref() != Some(task_id) {
        trace!(task_id, "complete rejected: not the active task");
        return unchanged(state, false, false);
    }

    let mut next = (**state).clone();
    next.completed_count += 1;
    next.error = None;
    advance(&mut next, SessionStatus::Idle);
    changed(next)
}

fn fail(state: &Arc<DownloadState>, task_id: &str, error: &str) -> Transition {
    if state.active_task.as_deref() != Some(task_id) {
        trace!(task_id, "fail rejected: not the active task");
        return unchanged(state, false, false);
    }

    let mut next = (**state).clone();
    next.failed_count += 1;
    next.error = Some(error.to_string());
    advance(&mut next, SessionStatus::Error);
    changed(next)
}

/// Clears the active slot and, if work is queued, auto-starts the next task
/// as part of the same transition. `drained_status` is used when the queue
/// is empty.
fn advance(next: &mut DownloadState, drained_status: SessionStatus) {
    next.active_task = None;
    if next.queue.is_empty() {
        next.status = drained_status;
    } else {
        let head = next.queue.remove(0);
        next.active_task = Some(head);
        next.status = SessionStatus::Processing;
    }
}

fn cancel(state: &Arc<DownloadState>) -> Transition {
    if state.queue.is_empty() && state.status == SessionStatus::Idle {
        return unchanged(state, true, false);
    }

    let mut next = (**state).clone();
    next.queue.clear();
    next.status = SessionStatus::Idle;
    // Counts and the in-flight task are untouched; the active task must
    // still report its own completion or failure.
    changed(next)
}

fn reset(state: &Arc<DownloadState>) -> Transition {
    if **state == DownloadState::initial() {
        return unchanged(state, true, false);
    }
    changed(DownloadState::initial())
}
