//! Interactive focus overlay in the terminal.
//!
//! The overlay runs on a tokio runtime; a plain thread reads key presses in
//! raw mode and forwards resolved commands, and the main task renders each
//! snapshot on a single status line.

use std::io::{self, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Subcommand;
use crossterm::{
    cursor::MoveToColumn,
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, SetTitle},
};
use focusroom_core::feedback::{format_title, InputFocus, Key, DEFAULT_TITLE};
use focusroom_core::{
    Config, Database, FeedbackError, FeedbackSink, FocusOverlay, Intensity, KeyBindings,
    OverlayCommand, OverlayEvent, PomodoroMachine, SessionRecorder, TaskId, TimerSnapshot,
};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use super::local_now;

const INPUT_POLL: Duration = Duration::from_millis(100);

#[derive(Subcommand)]
pub enum TimerAction {
    /// Open the focus overlay
    Run {
        /// Bind a task from `task list` to focus sessions
        #[arg(long)]
        task: Option<String>,
        /// Start the countdown immediately
        #[arg(long)]
        start: bool,
    },
    /// Print the active key bindings
    Keys,
}

/// Terminal presentation: bell, confetti line, window title.
struct TerminalFeedback;

impl FeedbackSink for TerminalFeedback {
    fn play_chime(&mut self) -> Result<(), FeedbackError> {
        let mut out = io::stdout();
        out.write_all(b"\x07")
            .and_then(|()| out.flush())
            .map_err(|e| FeedbackError::Playback(e.to_string()))
    }

    fn celebrate(&mut self, intensity: Intensity) {
        let burst = "*".repeat((intensity.particle_count() / 10) as usize);
        if let Err(e) = execute!(
            io::stdout(),
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(format!("{burst}\r\n"))
        ) {
            debug!(error = %e, "celebration not drawn");
        }
    }

    fn set_title(&mut self, title: &str) {
        if let Err(e) = execute!(io::stdout(), SetTitle(title)) {
            debug!(error = %e, "terminal title not set");
        }
    }
}

/// Leaves raw mode on drop, including on early return.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), SetTitle(DEFAULT_TITLE), Print("\r\n"));
    }
}

fn to_key(code: KeyCode) -> Option<Key> {
    match code {
        KeyCode::Char(' ') => Some(Key::Space),
        KeyCode::Char(c) => Some(Key::Char(c)),
        KeyCode::Esc => Some(Key::Escape),
        KeyCode::Enter => Some(Key::Enter),
        _ => None,
    }
}

/// Reads key presses until the overlay stops accepting commands.
fn read_input(bindings: KeyBindings, commands: mpsc::Sender<OverlayCommand>) -> io::Result<()> {
    while !commands.is_closed() {
        if !event::poll(INPUT_POLL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let ctrl_c =
            key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        let command = if ctrl_c {
            Some(OverlayCommand::Close)
        } else {
            to_key(key.code).and_then(|k| bindings.resolve(k, InputFocus::Overlay))
        };
        if let Some(command) = command {
            if commands.blocking_send(command).is_err() {
                break;
            }
        }
    }
    Ok(())
}

fn render(snap: &TimerSnapshot) -> io::Result<()> {
    let status = if snap.is_running { "running" } else { "paused" };
    let sound = if snap.sound_enabled { "on" } else { "off" };
    let mut line = format!(
        "{}  [{status}]  pomodoros: {}  sound: {sound}",
        format_title(snap.seconds_remaining, snap.mode),
        snap.pomodoro_count
    );
    if let Some(task) = &snap.task {
        let mark = if task.completed { "x" } else { " " };
        line.push_str(&format!("  [{mark}] {}", task.title));
    }
    execute!(
        io::stdout(),
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(line)
    )
}

fn announce(event: &OverlayEvent) -> io::Result<()> {
    let message = match event {
        OverlayEvent::IntervalCompleted {
            mode, next_mode, ..
        } => format!("{} finished, next: {}", mode.label(), next_mode.label()),
        OverlayEvent::TaskCompleted { task_id, .. } => format!("task {task_id} completed"),
        OverlayEvent::StoreFailed {
            operation, message, ..
        } => format!("could not save ({operation}): {message}"),
        OverlayEvent::Closed { .. } => return Ok(()),
    };
    execute!(
        io::stdout(),
        MoveToColumn(0),
        Clear(ClearType::CurrentLine),
        Print(format!("{message}\r\n"))
    )
}

fn run_overlay(task: Option<String>, start: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let machine = PomodoroMachine::new(config.durations()?);
    let bindings = KeyBindings::from_config(&config.shortcuts)?;
    let user = config.user_id();
    let db = Arc::new(Database::open()?);

    let bound = match task {
        Some(id) => {
            let id = TaskId::new(id);
            let record = db
                .get_task(&id)?
                .ok_or_else(|| format!("task not found: {id}"))?;
            Some(record.to_bound())
        }
        None => None,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let final_state = runtime.block_on(async {
        let overlay = FocusOverlay::new(
            machine,
            SessionRecorder::new(db.clone(), user.clone()),
            db.clone(),
            Box::new(TerminalFeedback),
            bound,
            config.notifications.sound_enabled,
        );
        let handle = overlay.spawn();
        let mut snapshots = handle.watch();
        let mut events = handle.subscribe();

        let _raw = RawMode::enable()?;
        let input = {
            let commands = handle.commands();
            let bindings = bindings.clone();
            thread::spawn(move || read_input(bindings, commands))
        };

        if start {
            handle.send(OverlayCommand::Start).await?;
        }
        render(&snapshots.borrow_and_update().clone())?;

        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snap = snapshots.borrow_and_update().clone();
                    if snap.closed {
                        break;
                    }
                    render(&snap)?;
                }
                event = events.recv() => match event {
                    Ok(event) => announce(&event)?,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        let state = handle.join().await?;
        match input.join() {
            Ok(result) => result?,
            Err(_) => debug!("input thread panicked"),
        }
        Ok::<_, Box<dyn std::error::Error>>(state)
    })?;

    let recorder = SessionRecorder::new(db, user);
    let stats = recorder.daily_stats(local_now())?;
    println!(
        "pomodoros this run: {}  today: {} min focused, {} completed, streak {} day(s)",
        final_state.pomodoro_count(),
        stats.total_focus_minutes,
        stats.completed_focus_count,
        stats.streak_days
    );
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        TimerAction::Run { task, start } => run_overlay(task, start),
        TimerAction::Keys => {
            let config = Config::load()?;
            let bindings = KeyBindings::from_config(&config.shortcuts)?;
            for (key, command) in bindings.entries() {
                println!("{key:<8} {command}");
            }
            Ok(())
        }
    }
}
