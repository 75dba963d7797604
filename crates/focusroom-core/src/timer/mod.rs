mod clock;
mod machine;
mod mode;

pub use clock::{ClockTick, PauseOutcome, TimerClock};
pub use machine::{
    BoundTask, Effect, PomodoroMachine, TimerEvent, TimerSnapshot, TimerState, Transition,
};
pub use mode::{ModeDurations, TimerMode};
