//! Pomodoro mode machine.
//!
//! A pure reducer: `reduce(state, event)` returns the next [`TimerState`]
//! and the [`Effect`]s the host must perform. Nothing here touches a clock,
//! a store or a window; see [`crate::overlay`] for the interpreter.
//!
//! ## Transitions
//!
//! ```text
//! Focus      --(complete/skip, count % N == 0)--> LongBreak
//! Focus      --(complete/skip, count % N != 0)--> ShortBreak
//! ShortBreak --(complete/skip)--> Focus
//! LongBreak  --(complete/skip)--> Focus
//! any        --(manual switch)--> any
//! ```
//!
//! Skip runs the same handler as natural completion: a skipped focus
//! interval counts toward the long-break cadence and its session is
//! recorded as completed.

use serde::{Deserialize, Serialize};

use super::clock::{ClockTick, PauseOutcome, TimerClock};
use super::mode::{ModeDurations, TimerMode};
use crate::feedback::{format_title, Intensity};
use crate::session::{SpaceId, TaskId};

/// Task attached to the overlay. Descriptive only; never gates the timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundTask {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub space_id: Option<SpaceId>,
    #[serde(default)]
    pub space_label: Option<String>,
    #[serde(default)]
    pub space_icon: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Inputs to the reducer. Time-bearing events carry the caller's monotonic
/// `now` in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Start { now_ms: u64 },
    Pause { now_ms: u64 },
    Toggle { now_ms: u64 },
    Reset,
    Skip,
    SwitchMode(TimerMode),
    Tick { now_ms: u64, generation: u64 },
    CompleteTask,
    ToggleSound,
    Close,
}

/// Side effects requested by a transition, performed in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartSession {
        kind: TimerMode,
        duration_minutes: u64,
        task_id: Option<TaskId>,
        space_id: Option<SpaceId>,
    },
    EndSession {
        completed: bool,
    },
    MarkTaskComplete(TaskId),
    PlaySound,
    Celebrate(Intensity),
    SetTitle(String),
    RestoreTitle,
    /// Schedule 1-second ticks stamped with `generation`.
    StartTicking {
        generation: u64,
    },
    /// Cancel any scheduled ticks.
    StopTicking,
    IntervalCompleted {
        mode: TimerMode,
        next: TimerMode,
        pomodoro_count: u32,
    },
}

/// Owned timer state. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    mode: TimerMode,
    clock: TimerClock,
    pomodoro_count: u32,
    /// A session has been opened for the current interval.
    interval_open: bool,
    #[serde(default)]
    task: Option<BoundTask>,
    sound_enabled: bool,
    #[serde(default)]
    closed: bool,
}

impl TimerState {
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.clock.seconds_remaining()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn pomodoro_count(&self) -> u32 {
        self.pomodoro_count
    }

    /// Generation of the clock's current run segment.
    pub fn generation(&self) -> u64 {
        self.clock.generation()
    }

    pub fn bound_task(&self) -> Option<&BoundTask> {
        self.task.as_ref()
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether the current interval has an open session.
    pub fn has_open_interval(&self) -> bool {
        self.interval_open
    }

    /// `mm:ss — <mode>`
    pub fn title(&self) -> String {
        format_title(self.seconds_remaining(), self.mode)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            mode: self.mode,
            seconds_remaining: self.seconds_remaining(),
            is_running: self.is_running(),
            pomodoro_count: self.pomodoro_count,
            sound_enabled: self.sound_enabled,
            task: self.task.clone(),
            closed: self.closed,
        }
    }
}

/// Serializable view of [`TimerState`] for hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub mode: TimerMode,
    pub seconds_remaining: u64,
    pub is_running: bool,
    pub pomodoro_count: u32,
    pub sound_enabled: bool,
    pub task: Option<BoundTask>,
    pub closed: bool,
}

/// Result of one reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: TimerState,
    pub effects: Vec<Effect>,
}

/// The reducer, parameterised by validated durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PomodoroMachine {
    durations: ModeDurations,
}

impl PomodoroMachine {
    pub fn new(durations: ModeDurations) -> Self {
        Self { durations }
    }

    pub fn durations(&self) -> &ModeDurations {
        &self.durations
    }

    /// Focus mode, full focus duration, not running.
    pub fn initial_state(&self, task: Option<BoundTask>, sound_enabled: bool) -> TimerState {
        TimerState {
            mode: TimerMode::Focus,
            clock: TimerClock::new(self.durations.secs(TimerMode::Focus)),
            pomodoro_count: 0,
            interval_open: false,
            task,
            sound_enabled,
            closed: false,
        }
    }

    pub fn reduce(&self, mut state: TimerState, event: TimerEvent) -> Transition {
        let mut effects = Vec::new();
        if state.closed {
            return Transition { state, effects };
        }

        match event {
            TimerEvent::Start { now_ms } => self.start(&mut state, now_ms, &mut effects),
            TimerEvent::Pause { now_ms } => self.pause(&mut state, now_ms, &mut effects),
            TimerEvent::Toggle { now_ms } => {
                if state.is_running() {
                    self.pause(&mut state, now_ms, &mut effects);
                } else {
                    self.start(&mut state, now_ms, &mut effects);
                }
            }
            TimerEvent::Reset => {
                let mode = state.mode;
                self.abandon_and_enter(&mut state, mode, &mut effects);
            }
            TimerEvent::Skip => self.complete_interval(&mut state, &mut effects),
            TimerEvent::SwitchMode(mode) => self.abandon_and_enter(&mut state, mode, &mut effects),
            TimerEvent::Tick { now_ms, generation } => {
                let before = state.seconds_remaining();
                match state.clock.tick(now_ms, generation) {
                    ClockTick::Idle | ClockTick::Stale => {}
                    ClockTick::Running { seconds_remaining } => {
                        if seconds_remaining != before {
                            effects.push(Effect::SetTitle(state.title()));
                        }
                    }
                    ClockTick::Completed => {
                        // The clock has already stopped itself.
                        effects.push(Effect::StopTicking);
                        self.complete_interval(&mut state, &mut effects);
                    }
                }
            }
            TimerEvent::CompleteTask => {
                if let Some(task) = state.task.as_mut().filter(|t| !t.completed) {
                    task.completed = true;
                    effects.push(Effect::MarkTaskComplete(task.id.clone()));
                    effects.push(Effect::Celebrate(Intensity::Large));
                }
            }
            TimerEvent::ToggleSound => state.sound_enabled = !state.sound_enabled,
            TimerEvent::Close => {
                if state.is_running() {
                    effects.push(Effect::StopTicking);
                }
                state.clock.reset(state.clock.seconds_remaining());
                if state.interval_open {
                    state.interval_open = false;
                    effects.push(Effect::EndSession { completed: false });
                }
                effects.push(Effect::RestoreTitle);
                state.closed = true;
            }
        }

        Transition { state, effects }
    }

    fn start(&self, state: &mut TimerState, now_ms: u64, effects: &mut Vec<Effect>) {
        if !state.clock.start(now_ms) {
            return;
        }
        if !state.interval_open {
            state.interval_open = true;
            let (task_id, space_id) = match (&state.task, state.mode) {
                (Some(task), TimerMode::Focus) => (Some(task.id.clone()), task.space_id.clone()),
                _ => (None, None),
            };
            effects.push(Effect::StartSession {
                kind: state.mode,
                duration_minutes: self.durations.minutes(state.mode),
                task_id,
                space_id,
            });
        }
        effects.push(Effect::StartTicking {
            generation: state.clock.generation(),
        });
        effects.push(Effect::SetTitle(state.title()));
    }

    fn pause(&self, state: &mut TimerState, now_ms: u64, effects: &mut Vec<Effect>) {
        match state.clock.pause(now_ms) {
            PauseOutcome::NotRunning => {}
            PauseOutcome::Paused => {
                effects.push(Effect::StopTicking);
                effects.push(Effect::SetTitle(state.title()));
            }
            PauseOutcome::Expired => {
                effects.push(Effect::StopTicking);
                self.complete_interval(state, effects);
            }
        }
    }

    /// Reset or manual switch: ends an open session as incomplete.
    fn abandon_and_enter(&self, state: &mut TimerState, mode: TimerMode, effects: &mut Vec<Effect>) {
        if state.is_running() {
            effects.push(Effect::StopTicking);
        }
        if state.interval_open {
            state.interval_open = false;
            effects.push(Effect::EndSession { completed: false });
        }
        self.enter(state, mode);
        effects.push(Effect::SetTitle(state.title()));
    }

    /// Shared by natural completion and skip.
    fn complete_interval(&self, state: &mut TimerState, effects: &mut Vec<Effect>) {
        if state.is_running() {
            effects.push(Effect::StopTicking);
        }
        if state.interval_open {
            state.interval_open = false;
            effects.push(Effect::EndSession { completed: true });
        }

        let finished = state.mode;
        let next = match finished {
            TimerMode::Focus => {
                state.pomodoro_count += 1;
                if state.pomodoro_count % self.durations.long_break_interval() == 0 {
                    TimerMode::LongBreak
                } else {
                    TimerMode::ShortBreak
                }
            }
            TimerMode::ShortBreak | TimerMode::LongBreak => TimerMode::Focus,
        };

        if finished == TimerMode::Focus {
            if state.sound_enabled {
                effects.push(Effect::PlaySound);
            }
            effects.push(Effect::Celebrate(Intensity::Small));
        }

        self.enter(state, next);
        effects.push(Effect::IntervalCompleted {
            mode: finished,
            next,
            pomodoro_count: state.pomodoro_count,
        });
        effects.push(Effect::SetTitle(state.title()));
    }

    fn enter(&self, state: &mut TimerState, mode: TimerMode) {
        state.mode = mode;
        state.clock.reset(self.durations.secs(mode));
    }
}
