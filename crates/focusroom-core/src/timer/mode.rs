use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};

/// The three Pomodoro modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerMode {
    Focus,
    ShortBreak,
    LongBreak,
}

impl TimerMode {
    /// Human-readable label shown in the title and the mode selector.
    pub fn label(&self) -> &'static str {
        match self {
            TimerMode::Focus => "Focus",
            TimerMode::ShortBreak => "Short Break",
            TimerMode::LongBreak => "Long Break",
        }
    }

    /// Stable storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerMode::Focus => "focus",
            TimerMode::ShortBreak => "short_break",
            TimerMode::LongBreak => "long_break",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimerMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "focus" => Ok(TimerMode::Focus),
            "short_break" | "short" => Ok(TimerMode::ShortBreak),
            "long_break" | "long" => Ok(TimerMode::LongBreak),
            _ => Err(ValidationError::UnknownMode(s.to_string())),
        }
    }
}

/// Validated per-mode durations and the long-break cadence.
///
/// Can only be built through [`ModeDurations::new`], so every timer sees
/// non-zero durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeDurations {
    focus_secs: u64,
    short_break_secs: u64,
    long_break_secs: u64,
    long_break_interval: u32,
}

impl ModeDurations {
    pub const DEFAULT_FOCUS_SECS: u64 = 1500;
    pub const DEFAULT_SHORT_BREAK_SECS: u64 = 300;
    pub const DEFAULT_LONG_BREAK_SECS: u64 = 900;
    pub const DEFAULT_LONG_BREAK_INTERVAL: u32 = 4;

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if any duration or the
    /// long-break interval is zero.
    pub fn new(
        focus_secs: u64,
        short_break_secs: u64,
        long_break_secs: u64,
        long_break_interval: u32,
    ) -> Result<Self, ConfigError> {
        for (key, value) in [
            ("timer.focus_secs", focus_secs),
            ("timer.short_break_secs", short_break_secs),
            ("timer.long_break_secs", long_break_secs),
            ("timer.long_break_interval", u64::from(long_break_interval)),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(Self {
            focus_secs,
            short_break_secs,
            long_break_secs,
            long_break_interval,
        })
    }

    pub fn secs(&self, mode: TimerMode) -> u64 {
        match mode {
            TimerMode::Focus => self.focus_secs,
            TimerMode::ShortBreak => self.short_break_secs,
            TimerMode::LongBreak => self.long_break_secs,
        }
    }

    /// Duration rounded to the nearest whole minute, as recorded on sessions.
    pub fn minutes(&self, mode: TimerMode) -> u64 {
        (self.secs(mode) + 30) / 60
    }

    /// Number of focus completions between long breaks.
    pub fn long_break_interval(&self) -> u32 {
        self.long_break_interval
    }
}

impl Default for ModeDurations {
    fn default() -> Self {
        Self {
            focus_secs: Self::DEFAULT_FOCUS_SECS,
            short_break_secs: Self::DEFAULT_SHORT_BREAK_SECS,
            long_break_secs: Self::DEFAULT_LONG_BREAK_SECS,
            long_break_interval: Self::DEFAULT_LONG_BREAK_INTERVAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_pomodoro() {
        let d = ModeDurations::default();
        assert_eq!(d.secs(TimerMode::Focus), 1500);
        assert_eq!(d.secs(TimerMode::ShortBreak), 300);
        assert_eq!(d.secs(TimerMode::LongBreak), 900);
        assert_eq!(d.minutes(TimerMode::Focus), 25);
        assert_eq!(d.long_break_interval(), 4);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = ModeDurations::new(1500, 0, 900, 4).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "timer.short_break_secs"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(ModeDurations::new(1500, 300, 900, 0).is_err());
    }

    #[test]
    fn parse_mode_names() {
        assert_eq!("focus".parse::<TimerMode>().unwrap(), TimerMode::Focus);
        assert_eq!("Short Break".parse::<TimerMode>().unwrap(), TimerMode::ShortBreak);
        assert_eq!("long-break".parse::<TimerMode>().unwrap(), TimerMode::LongBreak);
        assert!("nap".parse::<TimerMode>().is_err());
    }
}
