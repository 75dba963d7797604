//! Overlay driver.
//!
//! Owns the [`TimerState`] for one open focus overlay and runs it as a
//! single tokio task: UI commands and 1-second ticks are turned into
//! [`TimerEvent`]s, reduced by the [`PomodoroMachine`], and the resulting
//! [`Effect`]s are performed against the stores and the feedback sink.
//!
//! The tick interval only exists while the clock runs. It is dropped on
//! pause, reset, mode change, completion and close, and every tick carries
//! the generation it was scheduled for, so a tick from an earlier run
//! segment can never complete the current interval.
//!
//! Store calls are fire-and-forget. They are queued, in order, to a writer
//! task that runs each one on the blocking pool; a failure is logged,
//! broadcast as [`OverlayEvent::StoreFailed`], and the timer carries on.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{self, JoinHandle};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result, StoreError, ValidationError};
use crate::events::OverlayEvent;
use crate::feedback::{FeedbackCoordinator, FeedbackSink};
use crate::session::{SessionId, SessionRecorder, SpaceId, TaskId, TaskStore};
use crate::timer::{
    BoundTask, Effect, PomodoroMachine, TimerEvent, TimerMode, TimerSnapshot, TimerState,
    Transition,
};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

/// Host controls for an open overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayCommand {
    Start,
    Pause,
    Toggle,
    Reset,
    Skip,
    SwitchMode(TimerMode),
    ToggleSound,
    CompleteTask,
    Close,
}

impl OverlayCommand {
    pub fn name(&self) -> &'static str {
        match self {
            OverlayCommand::Start => "start",
            OverlayCommand::Pause => "pause",
            OverlayCommand::Toggle => "toggle",
            OverlayCommand::Reset => "reset",
            OverlayCommand::Skip => "skip",
            OverlayCommand::SwitchMode(TimerMode::Focus) => "mode.focus",
            OverlayCommand::SwitchMode(TimerMode::ShortBreak) => "mode.short_break",
            OverlayCommand::SwitchMode(TimerMode::LongBreak) => "mode.long_break",
            OverlayCommand::ToggleSound => "sound",
            OverlayCommand::CompleteTask => "complete_task",
            OverlayCommand::Close => "close",
        }
    }
}

impl fmt::Display for OverlayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OverlayCommand {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(mode) = s.strip_prefix("mode.") {
            return mode
                .parse()
                .map(OverlayCommand::SwitchMode)
                .map_err(|_| ValidationError::UnknownCommand(s.to_string()));
        }
        match s {
            "start" => Ok(OverlayCommand::Start),
            "pause" => Ok(OverlayCommand::Pause),
            "toggle" => Ok(OverlayCommand::Toggle),
            "reset" => Ok(OverlayCommand::Reset),
            "skip" => Ok(OverlayCommand::Skip),
            "sound" => Ok(OverlayCommand::ToggleSound),
            "complete_task" => Ok(OverlayCommand::CompleteTask),
            "close" => Ok(OverlayCommand::Close),
            _ => Err(ValidationError::UnknownCommand(s.to_string())),
        }
    }
}

struct Ticker {
    generation: u64,
    interval: Interval,
}

impl Ticker {
    fn new(generation: u64) -> Self {
        let mut interval = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            generation,
            interval,
        }
    }
}

async fn next_tick(ticker: &mut Option<Ticker>) -> u64 {
    match ticker {
        Some(t) => {
            t.interval.tick().await;
            t.generation
        }
        None => std::future::pending().await,
    }
}

/// A store write or notification, queued in the order the reducer produced it.
#[derive(Debug)]
enum StoreOp {
    Begin {
        kind: TimerMode,
        duration_minutes: u64,
        task_id: Option<TaskId>,
        space_id: Option<SpaceId>,
    },
    Finish {
        completed: bool,
    },
    MarkTaskComplete(TaskId),
    IntervalCompleted {
        mode: TimerMode,
        next: TimerMode,
        pomodoro_count: u32,
    },
    Closed,
}

/// Performs store writes for one overlay on its own task.
///
/// Each call runs on the blocking pool, one at a time, so a slow store
/// delays only later writes and never the countdown or user commands.
struct StoreWriter {
    recorder: Option<SessionRecorder>,
    tasks: Arc<dyn TaskStore>,
    events: broadcast::Sender<OverlayEvent>,
    /// Session closed by the latest `Finish`, reported with the next
    /// interval completion.
    finished: Option<SessionId>,
}

impl StoreWriter {
    async fn run(mut self, mut ops: mpsc::UnboundedReceiver<StoreOp>) {
        while let Some(op) = ops.recv().await {
            self.apply(op).await;
        }
        debug!("store writer drained");
    }

    async fn apply(&mut self, op: StoreOp) {
        match op {
            StoreOp::Begin {
                kind,
                duration_minutes,
                task_id,
                space_id,
            } => {
                let result = self
                    .with_recorder(move |rec| rec.begin(kind, duration_minutes, task_id, space_id))
                    .await;
                if let Err(e) = result {
                    self.report("start_session", &e);
                }
            }
            StoreOp::Finish { completed } => {
                match self.with_recorder(move |rec| rec.finish(completed)).await {
                    Ok(id) => self.finished = id,
                    Err(e) => {
                        self.finished = None;
                        self.report("end_session", &e);
                    }
                }
            }
            StoreOp::MarkTaskComplete(task_id) => {
                let tasks = Arc::clone(&self.tasks);
                let id = task_id.clone();
                let result = task::spawn_blocking(move || tasks.mark_complete(&id))
                    .await
                    .unwrap_or_else(|e| Err(StoreError::Unavailable(e.to_string())));
                match result {
                    Ok(()) => {
                        info!(task = %task_id, "bound task completed");
                        self.emit(OverlayEvent::TaskCompleted {
                            task_id,
                            at: Utc::now(),
                        });
                    }
                    Err(e) => self.report("mark_task_complete", &e),
                }
            }
            StoreOp::IntervalCompleted {
                mode,
                next,
                pomodoro_count,
            } => {
                let session_id = self.finished.take();
                self.emit(OverlayEvent::IntervalCompleted {
                    mode,
                    next_mode: next,
                    pomodoro_count,
                    session_id,
                    at: Utc::now(),
                });
            }
            StoreOp::Closed => self.emit(OverlayEvent::Closed { at: Utc::now() }),
        }
    }

    /// Run `f` against the recorder on the blocking pool and take it back.
    async fn with_recorder<T, F>(&mut self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SessionRecorder) -> Result<T, StoreError> + Send + 'static,
    {
        let Some(mut recorder) = self.recorder.take() else {
            return Err(StoreError::Unavailable("session recorder lost".into()));
        };
        match task::spawn_blocking(move || {
            let result = f(&mut recorder);
            (recorder, result)
        })
        .await
        {
            Ok((recorder, result)) => {
                self.recorder = Some(recorder);
                result
            }
            Err(e) => Err(StoreError::Unavailable(format!("store call aborted: {e}"))),
        }
    }

    fn report(&self, operation: &str, err: &StoreError) {
        warn!(operation, error = %err, "store write failed, timer continues");
        self.emit(OverlayEvent::StoreFailed {
            operation: operation.to_string(),
            message: err.to_string(),
            at: Utc::now(),
        });
    }

    fn emit(&self, event: OverlayEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// One open focus overlay.
pub struct FocusOverlay {
    machine: PomodoroMachine,
    state: TimerState,
    feedback: FeedbackCoordinator,
    events: broadcast::Sender<OverlayEvent>,
    snapshots: watch::Sender<TimerSnapshot>,
    store_ops: mpsc::UnboundedSender<StoreOp>,
    writer: Option<(StoreWriter, mpsc::UnboundedReceiver<StoreOp>)>,
    origin: Instant,
}

impl FocusOverlay {
    pub fn new(
        machine: PomodoroMachine,
        recorder: SessionRecorder,
        tasks: Arc<dyn TaskStore>,
        feedback: Box<dyn FeedbackSink>,
        task: Option<BoundTask>,
        sound_enabled: bool,
    ) -> Self {
        let state = machine.initial_state(task, sound_enabled);
        let (snapshots, _) = watch::channel(state.snapshot());
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (store_ops, ops_rx) = mpsc::unbounded_channel();
        let writer = StoreWriter {
            recorder: Some(recorder),
            tasks,
            events: events.clone(),
            finished: None,
        };
        Self {
            machine,
            state,
            feedback: FeedbackCoordinator::new(feedback),
            events,
            snapshots,
            store_ops,
            writer: Some((writer, ops_rx)),
            origin: Instant::now(),
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// Run the overlay on the current tokio runtime.
    pub fn spawn(self) -> OverlayHandle {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let snapshots = self.snapshots.subscribe();
        let events = self.events.clone();
        let task = tokio::spawn(self.run(rx));
        OverlayHandle {
            commands,
            snapshots,
            events,
            task,
        }
    }

    /// Process commands until `Close` or until every command sender is
    /// dropped. Returns the final state once every queued store write has
    /// been attempted.
    pub async fn run(mut self, mut commands: mpsc::Receiver<OverlayCommand>) -> TimerState {
        let writer = self
            .writer
            .take()
            .map(|(writer, ops)| tokio::spawn(writer.run(ops)));
        self.feedback.apply(&Effect::SetTitle(self.state.title()));
        let mut ticker: Option<Ticker> = None;

        loop {
            let event = tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(command) => self.command_event(command),
                    None => TimerEvent::Close,
                },
                generation = next_tick(&mut ticker) => TimerEvent::Tick {
                    now_ms: self.now_ms(),
                    generation,
                },
            };
            self.dispatch(event, &mut ticker);
            if self.state.is_closed() {
                break;
            }
        }

        let FocusOverlay {
            state, store_ops, ..
        } = self;
        drop(store_ops);
        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                warn!(error = %e, "store writer stopped abnormally");
            }
        }
        info!(pomodoros = state.pomodoro_count(), "focus overlay closed");
        state
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn command_event(&self, command: OverlayCommand) -> TimerEvent {
        let now_ms = self.now_ms();
        match command {
            OverlayCommand::Start => TimerEvent::Start { now_ms },
            OverlayCommand::Pause => TimerEvent::Pause { now_ms },
            OverlayCommand::Toggle => TimerEvent::Toggle { now_ms },
            OverlayCommand::Reset => TimerEvent::Reset,
            OverlayCommand::Skip => TimerEvent::Skip,
            OverlayCommand::SwitchMode(mode) => TimerEvent::SwitchMode(mode),
            OverlayCommand::ToggleSound => TimerEvent::ToggleSound,
            OverlayCommand::CompleteTask => TimerEvent::CompleteTask,
            OverlayCommand::Close => TimerEvent::Close,
        }
    }

    fn dispatch(&mut self, event: TimerEvent, ticker: &mut Option<Ticker>) {
        let Transition { state, effects } = self.machine.reduce(self.state.clone(), event);
        self.state = state;

        for effect in effects {
            if self.feedback.apply(&effect) {
                continue;
            }
            match effect {
                Effect::StartSession {
                    kind,
                    duration_minutes,
                    task_id,
                    space_id,
                } => self.queue(StoreOp::Begin {
                    kind,
                    duration_minutes,
                    task_id,
                    space_id,
                }),
                Effect::EndSession { completed } => self.queue(StoreOp::Finish { completed }),
                Effect::MarkTaskComplete(task_id) => self.queue(StoreOp::MarkTaskComplete(task_id)),
                Effect::StartTicking { generation } => *ticker = Some(Ticker::new(generation)),
                Effect::StopTicking => *ticker = None,
                Effect::IntervalCompleted {
                    mode,
                    next,
                    pomodoro_count,
                } => {
                    info!(
                        mode = mode.as_str(),
                        next = next.as_str(),
                        pomodoro_count,
                        "interval completed"
                    );
                    self.queue(StoreOp::IntervalCompleted {
                        mode,
                        next,
                        pomodoro_count,
                    });
                }
                Effect::PlaySound
                | Effect::Celebrate(_)
                | Effect::SetTitle(_)
                | Effect::RestoreTitle => {}
            }
        }

        self.snapshots.send_replace(self.state.snapshot());
        if self.state.is_closed() {
            self.queue(StoreOp::Closed);
        }
    }

    fn queue(&self, op: StoreOp) {
        if let Err(e) = self.store_ops.send(op) {
            warn!(op = ?e.0, "store writer gone, dropping write");
        }
    }
}

/// Handle to a spawned [`FocusOverlay`].
///
/// Dropping the handle (and every sender cloned from it) closes the overlay.
pub struct OverlayHandle {
    commands: mpsc::Sender<OverlayCommand>,
    snapshots: watch::Receiver<TimerSnapshot>,
    events: broadcast::Sender<OverlayEvent>,
    task: JoinHandle<TimerState>,
}

impl OverlayHandle {
    /// # Errors
    /// Returns [`CoreError::OverlayClosed`] once the overlay has stopped.
    pub async fn send(&self, command: OverlayCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::OverlayClosed)
    }

    /// Sender for input sources living on other tasks or threads.
    pub fn commands(&self) -> mpsc::Sender<OverlayCommand> {
        self.commands.clone()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.events.subscribe()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Close the overlay and wait for its final state.
    ///
    /// # Errors
    /// Returns [`CoreError::OverlayClosed`] if the overlay task panicked.
    pub async fn close(self) -> Result<TimerState> {
        // Already closed is fine; the join below still yields the state.
        let _ = self.commands.send(OverlayCommand::Close).await;
        self.join().await
    }

    /// Wait for the overlay to close on its own (for example via a key
    /// binding) and return its final state.
    ///
    /// # Errors
    /// Returns [`CoreError::OverlayClosed`] if the overlay task panicked.
    pub async fn join(self) -> Result<TimerState> {
        let OverlayHandle { commands, task, .. } = self;
        drop(commands);
        task.await.map_err(|_| CoreError::OverlayClosed)
    }
}
