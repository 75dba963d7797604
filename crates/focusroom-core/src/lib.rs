//! # Focusroom Core Library
//!
//! Core logic for the Focusroom focus timer. Every operation is available
//! through the standalone CLI binary; any richer frontend is a thin layer
//! over the same library.
//!
//! ## Architecture
//!
//! - **Timer**: a pure reducer ([`PomodoroMachine`]) over [`TimerState`],
//!   returning the side effects to perform, plus a deadline-anchored
//!   countdown clock ([`TimerClock`])
//! - **Session**: recording of focus and break intervals through the
//!   [`SessionStore`] seam, and daily statistics with streaks
//! - **Feedback**: chime, celebration, window title and keyboard shortcuts
//! - **Overlay**: a single async task driving one timer instance
//! - **Storage**: SQLite session and task persistence, TOML configuration
//!
//! ## Key Components
//!
//! - [`FocusOverlay`]: owns a timer, its ticker and its session recorder
//! - [`Database`]: session and task persistence
//! - [`Config`]: application configuration management

pub mod error;
pub mod events;
pub mod feedback;
pub mod overlay;
pub mod session;
pub mod storage;
pub mod timer;

pub use error::{
    ConfigError, CoreError, DatabaseError, FeedbackError, StoreError, ValidationError,
};
pub use events::OverlayEvent;
pub use feedback::{FeedbackCoordinator, FeedbackSink, Intensity, KeyBindings};
pub use overlay::{FocusOverlay, OverlayCommand, OverlayHandle};
pub use session::{
    DailyFocusStats, FocusSession, MemoryStore, NewSession, SessionId, SessionRecorder,
    SessionStore, SpaceId, TaskId, TaskStore, UserId,
};
pub use storage::{Config, Database, TaskRecord};
pub use timer::{
    BoundTask, ClockTick, Effect, ModeDurations, PauseOutcome, PomodoroMachine, TimerClock, TimerEvent,
    TimerMode, TimerSnapshot, TimerState, Transition,
};
