//! Session records and the data-access seams the timer depends on.
//!
//! The timer never talks to a database directly. It consumes a
//! [`SessionStore`] for focus/break records and a [`TaskStore`] for marking
//! the bound task complete; [`MemoryStore`] and
//! [`Database`](crate::storage::Database) implement both.

mod memory;
mod recorder;
mod stats;

pub use memory::MemoryStore;
pub use recorder::SessionRecorder;
pub use stats::{streak_days, DailyFocusStats};

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::timer::TimerMode;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Identifier of a persisted [`FocusSession`].
    SessionId
);
string_id!(TaskId);
string_id!(SpaceId);
string_id!(
    /// Owner of sessions and tasks.
    UserId
);

impl SessionId {
    /// Fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// A persisted record of one interval's execution outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: SessionId,
    pub user_id: UserId,
    #[serde(default)]
    pub task_id: Option<TaskId>,
    #[serde(default)]
    pub space_id: Option<SpaceId>,
    pub kind: TimerMode,
    pub duration_minutes: u64,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl FocusSession {
    /// Whether this row counts toward focus minutes, counts and streaks.
    pub fn is_completed_focus(&self) -> bool {
        self.kind == TimerMode::Focus && self.completed
    }
}

/// Arguments for [`SessionStore::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub user_id: UserId,
    pub kind: TimerMode,
    pub duration_minutes: u64,
    pub task_id: Option<TaskId>,
    pub space_id: Option<SpaceId>,
}

/// Persistence for focus and break sessions.
///
/// Calls are treated as fire-and-forget by the timer: an error is logged
/// and reported, never retried or rolled back. Implementations apply their
/// own timeout policy.
pub trait SessionStore: Send + Sync {
    /// Open a session record; returns its id.
    fn start(&self, session: &NewSession) -> Result<SessionId, StoreError>;

    /// Close a session record.
    fn end(&self, id: &SessionId, completed: bool) -> Result<(), StoreError>;

    /// All of the user's sessions started at or after `since`, oldest first.
    fn list_since(
        &self,
        user: &UserId,
        since: DateTime<Utc>,
    ) -> Result<Vec<FocusSession>, StoreError>;

    /// The user's sessions that started on the local calendar day of `now`.
    fn list_today(
        &self,
        user: &UserId,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<FocusSession>, StoreError> {
        let start = local_midnight(now);
        let end = start + Duration::days(1);
        Ok(self
            .list_since(user, start)?
            .into_iter()
            .filter(|s| s.started_at < end)
            .collect())
    }
}

/// Task collaborator: only the one operation the timer needs.
pub trait TaskStore: Send + Sync {
    fn mark_complete(&self, id: &TaskId) -> Result<(), StoreError>;
}

/// Start of the local day containing `now`, expressed in UTC.
pub(crate) fn local_midnight(now: DateTime<FixedOffset>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);
    now.offset()
        .from_local_datetime(&midnight)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| now.with_timezone(&Utc) - Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_midnight_respects_offset() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        // 23:30 local on Oct 16 is 04:30 UTC on Oct 17.
        let now = tz.with_ymd_and_hms(2026, 10, 16, 23, 30, 0).unwrap();
        let midnight = local_midnight(now);
        assert_eq!(
            midnight,
            Utc.with_ymd_and_hms(2026, 10, 16, 5, 0, 0).unwrap()
        );
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = TaskId::new("t-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"t-1\"");
    }
}
