use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset};
use tracing::{debug, warn};

use super::{
    local_midnight, DailyFocusStats, NewSession, SessionId, SessionStore, SpaceId, TaskId, UserId,
};
use crate::error::StoreError;
use crate::timer::TimerMode;

/// How far back the streak walk looks.
const STREAK_LOOKBACK_DAYS: i64 = 366;

/// Turns interval starts and ends into session rows.
///
/// Holds at most one open session. A failed `start` leaves nothing open, so
/// the matching `finish` becomes a no-op instead of ending a phantom row.
pub struct SessionRecorder {
    store: Arc<dyn SessionStore>,
    user_id: UserId,
    open: Option<SessionId>,
}

impl SessionRecorder {
    pub fn new(store: Arc<dyn SessionStore>, user_id: UserId) -> Self {
        Self {
            store,
            user_id,
            open: None,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn open_session(&self) -> Option<&SessionId> {
        self.open.as_ref()
    }

    /// Open a session for an interval that just started running.
    ///
    /// # Errors
    /// Returns the store error; the recorder is left with no open session.
    pub fn begin(
        &mut self,
        kind: TimerMode,
        duration_minutes: u64,
        task_id: Option<TaskId>,
        space_id: Option<SpaceId>,
    ) -> Result<SessionId, StoreError> {
        if let Some(stale) = self.open.take() {
            warn!(session = %stale, "previous session still open, closing as incomplete");
            self.store.end(&stale, false)?;
        }
        let id = self.store.start(&NewSession {
            user_id: self.user_id.clone(),
            kind,
            duration_minutes,
            task_id,
            space_id,
        })?;
        debug!(session = %id, kind = kind.as_str(), duration_minutes, "session started");
        self.open = Some(id.clone());
        Ok(id)
    }

    /// Close the open session, if any. Returns the id that was closed.
    ///
    /// # Errors
    /// Returns the store error. The session is considered closed either way.
    pub fn finish(&mut self, completed: bool) -> Result<Option<SessionId>, StoreError> {
        let Some(id) = self.open.take() else {
            debug!("no open session to finish");
            return Ok(None);
        };
        self.store.end(&id, completed)?;
        debug!(session = %id, completed, "session ended");
        Ok(Some(id))
    }

    /// Statistics for the local day containing `now`.
    ///
    /// # Errors
    /// Returns the store error if sessions cannot be listed.
    pub fn daily_stats(&self, now: DateTime<FixedOffset>) -> Result<DailyFocusStats, StoreError> {
        let since = local_midnight(now) - Duration::days(STREAK_LOOKBACK_DAYS);
        let sessions = self.store.list_since(&self.user_id, since)?;
        Ok(DailyFocusStats::compute(
            &sessions,
            now.date_naive(),
            now.offset(),
        ))
    }
}
