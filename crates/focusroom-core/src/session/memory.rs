use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::{FocusSession, NewSession, SessionId, SessionStore, TaskId, TaskStore, UserId};
use crate::error::StoreError;

/// In-memory session and task store.
///
/// Used by embedding hosts that persist elsewhere and by tests. Writes can
/// be made to fail with [`MemoryStore::set_unavailable`] to exercise the
/// degraded-store path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: Mutex<Vec<FocusSession>>,
    tasks: Mutex<HashMap<TaskId, bool>>,
    completed_tasks: Mutex<Vec<TaskId>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing session row.
    pub fn insert(&self, session: FocusSession) {
        lock(&self.sessions).push(session);
    }

    /// Register a task so it can be marked complete.
    pub fn add_task(&self, id: TaskId) {
        lock(&self.tasks).insert(id, false);
    }

    pub fn sessions(&self) -> Vec<FocusSession> {
        lock(&self.sessions).clone()
    }

    /// Every successful `mark_complete` call, in order.
    pub fn completed_tasks(&self) -> Vec<TaskId> {
        lock(&self.completed_tasks).clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionStore for MemoryStore {
    fn start(&self, session: &NewSession) -> Result<SessionId, StoreError> {
        self.check_available()?;
        let id = SessionId::generate();
        lock(&self.sessions).push(FocusSession {
            id: id.clone(),
            user_id: session.user_id.clone(),
            task_id: session.task_id.clone(),
            space_id: session.space_id.clone(),
            kind: session.kind,
            duration_minutes: session.duration_minutes,
            started_at: Utc::now(),
            ended_at: None,
            completed: false,
        });
        Ok(id)
    }

    fn end(&self, id: &SessionId, completed: bool) -> Result<(), StoreError> {
        self.check_available()?;
        let mut sessions = lock(&self.sessions);
        let session = sessions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| StoreError::SessionNotFound(id.to_string()))?;
        if session.ended_at.is_some() {
            return Err(StoreError::AlreadyEnded(id.to_string()));
        }
        session.ended_at = Some(Utc::now());
        session.completed = completed;
        Ok(())
    }

    fn list_since(
        &self,
        user: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<FocusSession>, StoreError> {
        self.check_available()?;
        let mut rows: Vec<FocusSession> = lock(&self.sessions)
            .iter()
            .filter(|s| &s.user_id == user && s.started_at >= since)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.started_at);
        Ok(rows)
    }
}

impl TaskStore for MemoryStore {
    fn mark_complete(&self, id: &TaskId) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tasks = lock(&self.tasks);
        let done = tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))?;
        *done = true;
        lock(&self.completed_tasks).push(id.clone());
        Ok(())
    }
}
