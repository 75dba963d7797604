//! Countdown clock.
//!
//! The clock is anchored to a monotonic deadline rather than counting
//! ticks: `start()` records `deadline = now + remaining` and every `tick()`
//! recomputes `remaining = max(0, deadline - now)`. Late or dropped ticks
//! therefore never accumulate drift. The caller supplies `now` in
//! milliseconds from any monotonic origin.
//!
//! Every run segment carries a generation number. Pausing, resetting and
//! completing bump it, so a tick scheduled for an earlier segment is
//! recognised as stale and ignored.

use serde::{Deserialize, Serialize};

/// Outcome of a single [`TimerClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// The clock is not running.
    Idle,
    /// The tick belongs to an earlier run segment.
    Stale,
    /// Still counting down.
    Running { seconds_remaining: u64 },
    /// Reached zero on this tick. Reported once per segment.
    Completed,
}

/// Outcome of a [`TimerClock::pause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    NotRunning,
    Paused,
    /// The deadline had already passed; the segment ends as a completion.
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerClock {
    remaining_ms: u64,
    /// Monotonic deadline; `Some` exactly while running.
    #[serde(default)]
    deadline_ms: Option<u64>,
    generation: u64,
}

impl TimerClock {
    pub fn new(seconds: u64) -> Self {
        Self {
            remaining_ms: seconds.saturating_mul(1000),
            deadline_ms: None,
            generation: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Whole seconds left, rounded up so the display reads `25:00` until a
    /// full second has elapsed.
    pub fn seconds_remaining(&self) -> u64 {
        self.remaining_ms.div_ceil(1000)
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Begin counting down. Returns `false` if already running or empty.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.is_running() || self.remaining_ms == 0 {
            return false;
        }
        self.generation += 1;
        self.deadline_ms = Some(now_ms.saturating_add(self.remaining_ms));
        true
    }

    /// Stop counting down, keeping the remainder.
    ///
    /// A pause that lands on or after the deadline reports
    /// [`PauseOutcome::Expired`]; the caller owes that segment its
    /// completion, since no tick will report it.
    pub fn pause(&mut self, now_ms: u64) -> PauseOutcome {
        if !self.is_running() {
            return PauseOutcome::NotRunning;
        }
        self.flush(now_ms);
        self.deadline_ms = None;
        self.generation += 1;
        if self.remaining_ms == 0 {
            PauseOutcome::Expired
        } else {
            PauseOutcome::Paused
        }
    }

    pub fn reset(&mut self, seconds: u64) {
        self.remaining_ms = seconds.saturating_mul(1000);
        self.deadline_ms = None;
        self.generation += 1;
    }

    pub fn tick(&mut self, now_ms: u64, generation: u64) -> ClockTick {
        if generation != self.generation {
            return ClockTick::Stale;
        }
        if !self.is_running() {
            return ClockTick::Idle;
        }
        self.flush(now_ms);
        if self.remaining_ms == 0 {
            self.deadline_ms = None;
            self.generation += 1;
            return ClockTick::Completed;
        }
        ClockTick::Running {
            seconds_remaining: self.seconds_remaining(),
        }
    }

    fn flush(&mut self, now_ms: u64) {
        if let Some(deadline) = self.deadline_ms {
            // min() keeps the countdown non-increasing even if `now` stalls.
            self.remaining_ms = self.remaining_ms.min(deadline.saturating_sub(now_ms));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn counts_down_one_second_per_tick() {
        let mut clock = TimerClock::new(3);
        assert!(clock.start(0));
        let generation = clock.generation();
        assert_eq!(
            clock.tick(1000, generation),
            ClockTick::Running { seconds_remaining: 2 }
        );
        assert_eq!(
            clock.tick(2000, generation),
            ClockTick::Running { seconds_remaining: 1 }
        );
        assert_eq!(clock.tick(3000, generation), ClockTick::Completed);
        assert!(!clock.is_running());
        assert_eq!(clock.seconds_remaining(), 0);
    }

    #[test]
    fn completes_exactly_once() {
        let mut clock = TimerClock::new(2);
        clock.start(0);
        let generation = clock.generation();
        let completions = (1..=10)
            .map(|s| clock.tick(s * 1000, generation))
            .filter(|t| *t == ClockTick::Completed)
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn pause_keeps_partial_second() {
        let mut clock = TimerClock::new(10);
        clock.start(0);
        assert_eq!(clock.pause(2500), PauseOutcome::Paused);
        assert_eq!(clock.remaining_ms(), 7500);
        assert_eq!(clock.seconds_remaining(), 8);

        // Paused time does not count.
        clock.start(60_000);
        let generation = clock.generation();
        assert_eq!(
            clock.tick(60_500, generation),
            ClockTick::Running { seconds_remaining: 7 }
        );
    }

    #[test]
    fn pause_at_deadline_reports_expiry() {
        let mut clock = TimerClock::new(3);
        clock.start(0);
        let generation = clock.generation();
        assert_eq!(clock.pause(3000), PauseOutcome::Expired);
        assert!(!clock.is_running());
        assert_eq!(clock.tick(4000, generation), ClockTick::Stale);
        assert_eq!(clock.pause(5000), PauseOutcome::NotRunning);

        let mut late = TimerClock::new(3);
        late.start(0);
        assert_eq!(late.pause(9000), PauseOutcome::Expired);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut clock = TimerClock::new(5);
        clock.start(0);
        let old = clock.generation();
        clock.pause(1000);
        clock.start(1000);
        assert_eq!(clock.tick(5000, old), ClockTick::Stale);
        assert_eq!(clock.seconds_remaining(), 4);
    }

    #[test]
    fn reset_stops_and_refills() {
        let mut clock = TimerClock::new(5);
        clock.start(0);
        let generation = clock.generation();
        clock.reset(60);
        assert!(!clock.is_running());
        assert_eq!(clock.seconds_remaining(), 60);
        assert_eq!(clock.tick(5000, generation), ClockTick::Stale);
    }

    #[test]
    fn late_tick_catches_up_to_wall_clock() {
        let mut clock = TimerClock::new(60);
        clock.start(0);
        let generation = clock.generation();
        assert_eq!(
            clock.tick(7000, generation),
            ClockTick::Running { seconds_remaining: 53 }
        );
    }

    proptest! {
        #[test]
        fn countdown_is_monotonic_and_never_negative(
            seconds in 1u64..600,
            steps in proptest::collection::vec(0u64..3000, 1..200),
        ) {
            let mut clock = TimerClock::new(seconds);
            clock.start(0);
            let generation = clock.generation();
            let mut now = 0u64;
            let mut previous = clock.seconds_remaining();
            let mut completions = 0;
            for step in steps {
                now += step;
                let tick = clock.tick(now, generation);
                if tick == ClockTick::Completed {
                    completions += 1;
                }
                let current = clock.seconds_remaining();
                prop_assert!(current <= previous);
                prop_assert_eq!(current, (seconds * 1000).saturating_sub(now).div_ceil(1000));
                previous = current;
            }
            prop_assert!(completions <= 1);
        }

        #[test]
        fn one_second_cadence_drops_exactly_one(seconds in 2u64..300) {
            let mut clock = TimerClock::new(seconds);
            clock.start(0);
            let generation = clock.generation();
            for elapsed in 1..seconds {
                let tick = clock.tick(elapsed * 1000, generation);
                prop_assert_eq!(tick, ClockTick::Running { seconds_remaining: seconds - elapsed });
            }
            prop_assert_eq!(clock.tick(seconds * 1000, generation), ClockTick::Completed);
        }
    }
}
