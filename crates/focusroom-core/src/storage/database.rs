//! SQLite-based session and task storage.
//!
//! Provides persistent storage for:
//! - Focus and break session records (open and closed)
//! - A minimal task list that focus sessions can be bound to

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{DatabaseError, StoreError};
use crate::session::{
    FocusSession, NewSession, SessionId, SessionStore, SpaceId, TaskId, TaskStore, UserId,
};
use crate::timer::{BoundTask, TimerMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub space_label: Option<String>,
    pub space_icon: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl TaskRecord {
    /// Tasks store only a display label for their space, so the bound task
    /// carries no space id and its sessions are recorded without one.
    pub fn to_bound(&self) -> BoundTask {
        BoundTask {
            id: self.id.clone(),
            title: self.title.clone(),
            space_id: None,
            space_label: self.space_label.clone(),
            space_icon: self.space_icon.clone(),
            completed: self.completed,
        }
    }
}

/// SQLite database for sessions and tasks.
///
/// The connection sits behind a mutex so one `Arc<Database>` can serve as
/// both the session and the task store.
pub struct Database {
    conn: Mutex<Connection>,
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(table: &str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::CorruptRow {
            table: table.to_string(),
            message: format!("bad timestamp '{raw}': {e}"),
        })
}

struct SessionRow {
    id: String,
    user_id: String,
    task_id: Option<String>,
    space_id: Option<String>,
    kind: String,
    duration_min: u64,
    started_at: String,
    ended_at: Option<String>,
    completed: bool,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            task_id: row.get(2)?,
            space_id: row.get(3)?,
            kind: row.get(4)?,
            duration_min: row.get(5)?,
            started_at: row.get(6)?,
            ended_at: row.get(7)?,
            completed: row.get(8)?,
        })
    }

    fn into_session(self) -> Result<FocusSession, DatabaseError> {
        let kind: TimerMode = self.kind.parse().map_err(|e| DatabaseError::CorruptRow {
            table: "sessions".into(),
            message: format!("{e}"),
        })?;
        Ok(FocusSession {
            id: SessionId::from(self.id),
            user_id: UserId::from(self.user_id),
            task_id: self.task_id.map(TaskId::from),
            space_id: self.space_id.map(SpaceId::from),
            kind,
            duration_minutes: self.duration_min,
            started_at: parse_ts("sessions", &self.started_at)?,
            ended_at: self
                .ended_at
                .as_deref()
                .map(|raw| parse_ts("sessions", raw))
                .transpose()?,
            completed: self.completed,
        })
    }
}

impl Database {
    /// Open the database at `~/.config/focusroom/focusroom.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let dir = data_dir()
            .map_err(|e| DatabaseError::QueryFailed(format!("data directory unavailable: {e}")))?;
        Self::open_at(&dir.join("focusroom.db"))
    }

    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests and throwaway hosts).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS sessions (
                    id           TEXT PRIMARY KEY,
                    user_id      TEXT NOT NULL,
                    task_id      TEXT,
                    space_id     TEXT,
                    kind         TEXT NOT NULL,
                    duration_min INTEGER NOT NULL,
                    started_at   TEXT NOT NULL,
                    ended_at     TEXT,
                    completed    INTEGER NOT NULL DEFAULT 0
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id          TEXT PRIMARY KEY,
                    user_id     TEXT NOT NULL,
                    title       TEXT NOT NULL,
                    space_label TEXT,
                    space_icon  TEXT,
                    completed   INTEGER NOT NULL DEFAULT 0,
                    created_at  TEXT NOT NULL
                );

                -- Create indexes for common query patterns
                CREATE INDEX IF NOT EXISTS idx_sessions_user_started ON sessions(user_id, started_at);
                CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, completed);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Insert a session with explicit timestamps (imports, backfill, tests).
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn insert_session(&self, session: &FocusSession) -> Result<(), DatabaseError> {
        self.conn()?.execute(
            "INSERT INTO sessions (id, user_id, task_id, space_id, kind, duration_min, started_at, ended_at, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.id.as_str(),
                session.user_id.as_str(),
                session.task_id.as_ref().map(|t| t.as_str()),
                session.space_id.as_ref().map(|s| s.as_str()),
                session.kind.as_str(),
                session.duration_minutes,
                ts(session.started_at),
                session.ended_at.map(ts),
                session.completed,
            ],
        )?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the insert fails.
    pub fn create_task(
        &self,
        user: &UserId,
        title: &str,
        space_label: Option<&str>,
        space_icon: Option<&str>,
    ) -> Result<TaskRecord, DatabaseError> {
        let task = TaskRecord {
            id: TaskId::new(uuid::Uuid::new_v4().to_string()),
            user_id: user.clone(),
            title: title.to_string(),
            space_label: space_label.map(str::to_string),
            space_icon: space_icon.map(str::to_string),
            completed: false,
            created_at: Utc::now(),
        };
        self.conn()?.execute(
            "INSERT INTO tasks (id, user_id, title, space_label, space_icon, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            params![
                task.id.as_str(),
                task.user_id.as_str(),
                task.title,
                task.space_label,
                task.space_icon,
                ts(task.created_at),
            ],
        )?;
        Ok(task)
    }

    /// # Errors
    /// Returns an error if the query fails or a row is corrupt.
    pub fn get_task(&self, id: &TaskId) -> Result<Option<TaskRecord>, DatabaseError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, user_id, title, space_label, space_icon, completed, created_at
                 FROM tasks WHERE id = ?1",
                params![id.as_str()],
                Self::task_columns,
            )
            .optional()?;
        row.map(Self::into_task).transpose()
    }

    /// Tasks for `user`, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails or a row is corrupt.
    pub fn list_tasks(
        &self,
        user: &UserId,
        include_completed: bool,
    ) -> Result<Vec<TaskRecord>, DatabaseError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, title, space_label, space_icon, completed, created_at
             FROM tasks
             WHERE user_id = ?1 AND (?2 OR completed = 0)
             ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user.as_str(), include_completed], Self::task_columns)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(Self::into_task(row?)?);
        }
        Ok(tasks)
    }

    #[allow(clippy::type_complexity)]
    fn task_columns(
        row: &Row<'_>,
    ) -> rusqlite::Result<(String, String, String, Option<String>, Option<String>, bool, String)> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    }

    fn into_task(
        (id, user_id, title, space_label, space_icon, completed, created_at): (
            String,
            String,
            String,
            Option<String>,
            Option<String>,
            bool,
            String,
        ),
    ) -> Result<TaskRecord, DatabaseError> {
        Ok(TaskRecord {
            id: TaskId::from(id),
            user_id: UserId::from(user_id),
            title,
            space_label,
            space_icon,
            completed,
            created_at: parse_ts("tasks", &created_at)?,
        })
    }
}

impl SessionStore for Database {
    fn start(&self, session: &NewSession) -> Result<SessionId, StoreError> {
        let id = SessionId::generate();
        self.conn()?.execute(
            "INSERT INTO sessions (id, user_id, task_id, space_id, kind, duration_min, started_at, completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
            params![
                id.as_str(),
                session.user_id.as_str(),
                session.task_id.as_ref().map(|t| t.as_str()),
                session.space_id.as_ref().map(|s| s.as_str()),
                session.kind.as_str(),
                session.duration_minutes,
                ts(Utc::now()),
            ],
        )?;
        Ok(id)
    }

    fn end(&self, id: &SessionId, completed: bool) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE sessions SET ended_at = ?2, completed = ?3
             WHERE id = ?1 AND ended_at IS NULL",
            params![id.as_str(), ts(Utc::now()), completed],
        )?;
        if changed == 1 {
            return Ok(());
        }
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
            params![id.as_str()],
            |row| row.get(0),
        )?;
        if exists {
            Err(StoreError::AlreadyEnded(id.to_string()))
        } else {
            Err(StoreError::SessionNotFound(id.to_string()))
        }
    }

    fn list_since(
        &self,
        user: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<FocusSession>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, task_id, space_id, kind, duration_min, started_at, ended_at, completed
             FROM sessions
             WHERE user_id = ?1 AND started_at >= ?2
             ORDER BY started_at ASC",
        )?;
        let rows = stmt.query_map(params![user.as_str(), ts(since)], SessionRow::from_row)?;
        let mut sessions = Vec::new();
        for row in rows {
            sessions.push(row?.into_session()?);
        }
        Ok(sessions)
    }
}

impl TaskStore for Database {
    fn mark_complete(&self, id: &TaskId) -> Result<(), StoreError> {
        let changed = self.conn()?.execute(
            "UPDATE tasks SET completed = 1 WHERE id = ?1",
            params![id.as_str()],
        )?;
        if changed == 0 {
            return Err(StoreError::TaskNotFound(id.to_string()));
        }
        Ok(())
    }
}
