//! Overlay driver tests on a paused tokio clock.
//!
//! `start_paused` makes the runtime advance time only when every task is
//! idle, so a 25-minute focus interval runs in microseconds and the tick
//! cadence is exact.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use focusroom_core::feedback::RecordingFeedback;
use focusroom_core::{
    BoundTask, FocusOverlay, FocusSession, Intensity, MemoryStore, NewSession, OverlayCommand,
    OverlayEvent, OverlayHandle, PomodoroMachine, SessionId, SessionRecorder, SessionStore,
    StoreError, TaskId, TimerMode, UserId,
};
use tokio::time::sleep;

fn bound_task() -> BoundTask {
    BoundTask {
        id: TaskId::new("task-1"),
        title: "Write report".into(),
        space_id: None,
        space_label: Some("Work".into()),
        space_icon: None,
        completed: false,
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    feedback: RecordingFeedback,
    handle: OverlayHandle,
}

fn open(task: Option<BoundTask>, sound_enabled: bool) -> Harness {
    let store = Arc::new(MemoryStore::new());
    store.add_task(TaskId::new("task-1"));
    let feedback = RecordingFeedback::new();
    let overlay = FocusOverlay::new(
        PomodoroMachine::default(),
        SessionRecorder::new(store.clone(), UserId::new("user-1")),
        store.clone(),
        Box::new(feedback.clone()),
        task,
        sound_enabled,
    );
    Harness {
        store,
        feedback,
        handle: overlay.spawn(),
    }
}

/// Let the overlay drain its command queue without moving the clock much.
async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn focus_runs_to_completion_after_reset() {
    let h = open(Some(bound_task()), true);
    let mut events = h.handle.subscribe();

    h.handle.send(OverlayCommand::Start).await.unwrap();
    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(h.handle.snapshot().seconds_remaining, 1490);

    h.handle.send(OverlayCommand::Reset).await.unwrap();
    settle().await;
    let snap = h.handle.snapshot();
    assert_eq!(snap.seconds_remaining, 1500);
    assert!(!snap.is_running);

    h.handle.send(OverlayCommand::Start).await.unwrap();
    sleep(Duration::from_millis(1_500_500)).await;

    let snap = h.handle.snapshot();
    assert_eq!(snap.mode, TimerMode::ShortBreak);
    assert_eq!(snap.seconds_remaining, 300);
    assert_eq!(snap.pomodoro_count, 1);
    assert!(!snap.is_running);

    let sessions = h.store.sessions();
    assert_eq!(sessions.len(), 2);
    assert!(!sessions[0].completed);
    assert!(sessions[0].ended_at.is_some());
    assert!(sessions[1].completed);
    assert_eq!(sessions[1].duration_minutes, 25);
    assert_eq!(sessions[1].task_id, Some(TaskId::new("task-1")));

    assert_eq!(h.feedback.chime_count(), 1);
    assert_eq!(h.feedback.celebrations(Intensity::Small), 1);
    assert_eq!(h.feedback.celebrations(Intensity::Large), 0);
    assert!(h.store.completed_tasks().is_empty());

    match events.recv().await.unwrap() {
        OverlayEvent::IntervalCompleted {
            mode,
            next_mode,
            pomodoro_count,
            session_id,
            ..
        } => {
            assert_eq!(mode, TimerMode::Focus);
            assert_eq!(next_mode, TimerMode::ShortBreak);
            assert_eq!(pomodoro_count, 1);
            assert_eq!(session_id, Some(sessions[1].id.clone()));
        }
        other => panic!("unexpected event {other:?}"),
    }

    h.handle.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn pause_freezes_countdown() {
    let h = open(None, true);
    h.handle.send(OverlayCommand::Toggle).await.unwrap();
    sleep(Duration::from_millis(5_500)).await;
    h.handle.send(OverlayCommand::Toggle).await.unwrap();
    settle().await;
    let paused_at = h.handle.snapshot().seconds_remaining;
    assert_eq!(paused_at, 1495);

    sleep(Duration::from_secs(120)).await;
    let snap = h.handle.snapshot();
    assert!(!snap.is_running);
    assert_eq!(snap.seconds_remaining, paused_at);

    // Resume keeps the same session.
    h.handle.send(OverlayCommand::Toggle).await.unwrap();
    settle().await;
    assert_eq!(h.store.sessions().len(), 1);

    h.handle.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn close_while_running_releases_everything() {
    let h = open(Some(bound_task()), true);
    let mut events = h.handle.subscribe();
    h.handle.send(OverlayCommand::Start).await.unwrap();
    sleep(Duration::from_millis(3_500)).await;

    let watcher = h.handle.watch();
    let store = h.store.clone();
    let feedback = h.feedback.clone();
    let state = h.handle.close().await.unwrap();
    assert!(state.is_closed());
    assert!(!state.is_running());

    let calls_at_close = feedback.calls().len();
    sleep(Duration::from_secs(3_600)).await;

    // Nothing moves after close: no ticks, no sessions, no feedback.
    assert_eq!(feedback.calls().len(), calls_at_close);
    assert_eq!(feedback.current_title(), "Focusroom");
    let sessions = store.sessions();
    assert_eq!(sessions.len(), 1);
    assert!(!sessions[0].completed);
    assert!(sessions[0].ended_at.is_some());
    assert!(watcher.borrow().closed);

    let mut saw_closed = false;
    while let Ok(event) = events.try_recv() {
        saw_closed |= matches!(event, OverlayEvent::Closed { .. });
    }
    assert!(saw_closed);
}

#[tokio::test(start_paused = true)]
async fn dropping_every_sender_closes_overlay() {
    let h = open(None, true);
    h.handle.send(OverlayCommand::Start).await.unwrap();
    settle().await;
    let state = h.handle.join().await.unwrap();
    assert!(state.is_closed());
    let sessions = h.store.sessions();
    assert_eq!(sessions.len(), 1);
    assert!(!sessions[0].completed);
}

#[tokio::test(start_paused = true)]
async fn skip_advances_and_counts() {
    let h = open(None, true);
    h.handle.send(OverlayCommand::Start).await.unwrap();
    sleep(Duration::from_millis(2_500)).await;
    h.handle.send(OverlayCommand::Skip).await.unwrap();
    settle().await;

    let snap = h.handle.snapshot();
    assert_eq!(snap.mode, TimerMode::ShortBreak);
    assert_eq!(snap.pomodoro_count, 1);
    assert_eq!(h.feedback.chime_count(), 1);
    let sessions = h.store.sessions();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].completed);

    h.handle.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn muted_overlay_celebrates_without_chime() {
    let h = open(None, true);
    h.handle.send(OverlayCommand::ToggleSound).await.unwrap();
    h.handle.send(OverlayCommand::Start).await.unwrap();
    sleep(Duration::from_millis(1_500_500)).await;

    assert!(!h.handle.snapshot().sound_enabled);
    assert_eq!(h.feedback.chime_count(), 0);
    assert_eq!(h.feedback.celebrations(Intensity::Small), 1);

    h.handle.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn complete_task_marks_once_and_keeps_timer_running() {
    let h = open(Some(bound_task()), true);
    let mut events = h.handle.subscribe();
    h.handle.send(OverlayCommand::Start).await.unwrap();
    h.handle.send(OverlayCommand::CompleteTask).await.unwrap();
    h.handle.send(OverlayCommand::CompleteTask).await.unwrap();
    settle().await;

    assert_eq!(h.store.completed_tasks(), vec![TaskId::new("task-1")]);
    assert_eq!(h.feedback.celebrations(Intensity::Large), 1);
    let snap = h.handle.snapshot();
    assert!(snap.is_running);
    assert!(snap.task.map(|t| t.completed).unwrap_or(false));

    assert!(matches!(
        events.recv().await.unwrap(),
        OverlayEvent::TaskCompleted { .. }
    ));

    h.handle.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn store_failure_does_not_stop_the_timer() {
    let h = open(None, true);
    let mut events = h.handle.subscribe();
    h.store.set_unavailable(true);

    h.handle.send(OverlayCommand::Start).await.unwrap();
    sleep(Duration::from_millis(1_500_500)).await;

    let snap = h.handle.snapshot();
    assert_eq!(snap.mode, TimerMode::ShortBreak);
    assert_eq!(snap.pomodoro_count, 1);
    assert_eq!(h.feedback.chime_count(), 1);
    assert!(h.store.sessions().is_empty());

    match events.recv().await.unwrap() {
        OverlayEvent::StoreFailed { operation, .. } => assert_eq!(operation, "start_session"),
        other => panic!("unexpected event {other:?}"),
    }
    match events.recv().await.unwrap() {
        OverlayEvent::IntervalCompleted { session_id, .. } => assert!(session_id.is_none()),
        other => panic!("unexpected event {other:?}"),
    }

    h.handle.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn mode_switch_abandons_running_interval() {
    let h = open(None, true);
    h.handle.send(OverlayCommand::Start).await.unwrap();
    sleep(Duration::from_millis(4_500)).await;
    h.handle
        .send(OverlayCommand::SwitchMode(TimerMode::LongBreak))
        .await
        .unwrap();
    settle().await;

    let snap = h.handle.snapshot();
    assert_eq!(snap.mode, TimerMode::LongBreak);
    assert_eq!(snap.seconds_remaining, 900);
    assert!(!snap.is_running);
    assert_eq!(snap.pomodoro_count, 0);

    // The stale ticker is gone: time passing changes nothing.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.handle.snapshot().seconds_remaining, 900);
    assert!(!h.store.sessions()[0].completed);

    h.handle.close().await.unwrap();
}

/// Session store that takes a long time to open a session.
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
}

impl SessionStore for SlowStore {
    fn start(&self, session: &NewSession) -> Result<SessionId, StoreError> {
        std::thread::sleep(self.delay);
        self.inner.start(session)
    }

    fn end(&self, id: &SessionId, completed: bool) -> Result<(), StoreError> {
        self.inner.end(id, completed)
    }

    fn list_since(
        &self,
        user: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<FocusSession>, StoreError> {
        self.inner.list_since(user, since)
    }
}

#[tokio::test]
async fn slow_store_does_not_delay_commands() {
    let store = Arc::new(SlowStore {
        inner: MemoryStore::new(),
        delay: Duration::from_millis(1_500),
    });
    let overlay = FocusOverlay::new(
        PomodoroMachine::default(),
        SessionRecorder::new(store.clone(), UserId::new("user-1")),
        Arc::new(MemoryStore::new()),
        Box::new(RecordingFeedback::new()),
        None,
        true,
    );
    let handle = overlay.spawn();
    let mut snapshots = handle.watch();

    let sent = Instant::now();
    handle.send(OverlayCommand::Start).await.unwrap();
    handle
        .send(OverlayCommand::SwitchMode(TimerMode::ShortBreak))
        .await
        .unwrap();
    let switched = tokio::time::timeout(Duration::from_millis(500), async {
        while snapshots.borrow_and_update().mode != TimerMode::ShortBreak {
            snapshots.changed().await.unwrap();
        }
    })
    .await;
    assert!(switched.is_ok(), "mode switch waited on the store");
    assert!(sent.elapsed() < Duration::from_millis(500));

    // Close waits for the queued writes, which land in order.
    handle.close().await.unwrap();
    let sessions = store.inner.sessions();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].kind, TimerMode::Focus);
    assert!(!sessions[0].completed);
    assert!(sessions[0].ended_at.is_some());
}
