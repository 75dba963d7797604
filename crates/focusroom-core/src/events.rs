use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::session::{SessionId, TaskId};
use crate::timer::TimerMode;

/// Lifecycle notifications from a running overlay.
/// Hosts subscribe to refresh task lists and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OverlayEvent {
    /// An interval ended by expiry or skip.
    IntervalCompleted {
        mode: TimerMode,
        next_mode: TimerMode,
        pomodoro_count: u32,
        /// Absent if the session could not be recorded.
        session_id: Option<SessionId>,
        at: DateTime<Utc>,
    },
    /// The bound task was marked complete in the task store.
    TaskCompleted {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    /// A store write failed; the timer carried on.
    StoreFailed {
        operation: String,
        message: String,
        at: DateTime<Utc>,
    },
    Closed {
        at: DateTime<Utc>,
    },
}
