use std::collections::HashSet;

use chrono::{NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use super::FocusSession;

/// Derived daily statistics. Always recomputed from session rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DailyFocusStats {
    pub total_focus_minutes: u64,
    pub completed_focus_count: u64,
    pub streak_days: u32,
}

impl DailyFocusStats {
    /// Aggregate `sessions` for the local calendar day `today` in `tz`.
    ///
    /// Only completed focus sessions count. `sessions` may span more than
    /// one day; older rows only feed the streak.
    pub fn compute<Tz: TimeZone>(sessions: &[FocusSession], today: NaiveDate, tz: &Tz) -> Self {
        let mut stats = DailyFocusStats {
            streak_days: streak_days(sessions, today, tz),
            ..Default::default()
        };
        for session in sessions
            .iter()
            .filter(|s| s.is_completed_focus())
            .filter(|s| s.started_at.with_timezone(tz).date_naive() == today)
        {
            stats.total_focus_minutes += session.duration_minutes;
            stats.completed_focus_count += 1;
        }
        stats
    }
}

/// Consecutive local days, walking back from `today`, with at least one
/// completed focus session.
///
/// An empty `today` does not break the chain since the day may still be in
/// progress; the walk then starts from yesterday.
pub fn streak_days<Tz: TimeZone>(sessions: &[FocusSession], today: NaiveDate, tz: &Tz) -> u32 {
    let days: HashSet<NaiveDate> = sessions
        .iter()
        .filter(|s| s.is_completed_focus())
        .map(|s| s.started_at.with_timezone(tz).date_naive())
        .collect();

    let mut day = today;
    if !days.contains(&day) {
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => return 0,
        }
    }

    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionId, UserId};
    use crate::timer::TimerMode;
    use chrono::{DateTime, Duration, FixedOffset, Utc};

    fn session(kind: TimerMode, started_at: DateTime<Utc>, minutes: u64, completed: bool) -> FocusSession {
        FocusSession {
            id: SessionId::generate(),
            user_id: UserId::new("u"),
            task_id: None,
            space_id: None,
            kind,
            duration_minutes: minutes,
            started_at,
            ended_at: Some(started_at + Duration::minutes(minutes as i64)),
            completed,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn at(day: NaiveDate, hour: u32) -> DateTime<Utc> {
        day.and_hms_opt(hour, 0, 0).unwrap().and_utc()
    }

    #[test]
    fn only_completed_focus_counts() {
        let t = today();
        let rows = vec![
            session(TimerMode::Focus, at(t, 9), 25, true),
            session(TimerMode::Focus, at(t, 10), 25, true),
            session(TimerMode::Focus, at(t, 11), 25, false),
            session(TimerMode::ShortBreak, at(t, 9), 5, true),
            session(TimerMode::LongBreak, at(t, 12), 15, true),
        ];
        let stats = DailyFocusStats::compute(&rows, t, &Utc);
        assert_eq!(stats.total_focus_minutes, 50);
        assert_eq!(stats.completed_focus_count, 2);
        assert_eq!(stats.streak_days, 1);
    }

    #[test]
    fn yesterday_rows_do_not_count_toward_today() {
        let t = today();
        let y = t.pred_opt().unwrap();
        let rows = vec![session(TimerMode::Focus, at(y, 9), 25, true)];
        let stats = DailyFocusStats::compute(&rows, t, &Utc);
        assert_eq!(stats.total_focus_minutes, 0);
        assert_eq!(stats.completed_focus_count, 0);
        assert_eq!(stats.streak_days, 1);
    }

    #[test]
    fn streak_uses_local_day_boundary() {
        // 23:30 local (UTC-5) on the 15th is 04:30 UTC on the 16th.
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let t = today();
        let late_evening = at(t, 4) + Duration::minutes(30);
        let rows = vec![session(TimerMode::Focus, late_evening, 25, true)];
        assert_eq!(streak_days(&rows, t, &tz), 1);
        let stats = DailyFocusStats::compute(&rows, t, &tz);
        assert_eq!(stats.completed_focus_count, 0);
    }

    #[test]
    fn incomplete_sessions_do_not_extend_streak() {
        let t = today();
        let y = t.pred_opt().unwrap();
        let rows = vec![
            session(TimerMode::Focus, at(t, 9), 25, true),
            session(TimerMode::Focus, at(y, 9), 25, false),
            session(TimerMode::ShortBreak, at(y, 10), 5, true),
        ];
        assert_eq!(streak_days(&rows, t, &Utc), 1);
    }
}
