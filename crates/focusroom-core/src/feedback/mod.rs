//! Presentation feedback: chime, celebration, window title and keyboard
//! shortcuts.
//!
//! None of this is essential to the timer. A sink that fails to play a
//! sound is logged at debug level and otherwise ignored.

mod keys;
mod recording;

pub use keys::{InputFocus, Key, KeyBindings};
pub use recording::{FeedbackCall, RecordingFeedback};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FeedbackError;
use crate::timer::{Effect, TimerMode};

/// Title shown when no overlay is open.
pub const DEFAULT_TITLE: &str = "Focusroom";

/// Strength of a celebratory burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    /// End of a focus interval.
    Small,
    /// Bound task completed.
    Large,
}

impl Intensity {
    pub fn particle_count(&self) -> u32 {
        match self {
            Intensity::Small => 60,
            Intensity::Large => 200,
        }
    }
}

/// `mm:ss — Label`
pub fn format_title(seconds_remaining: u64, mode: TimerMode) -> String {
    format!(
        "{:02}:{:02} — {}",
        seconds_remaining / 60,
        seconds_remaining % 60,
        mode.label()
    )
}

/// Host-side presentation surface.
pub trait FeedbackSink: Send {
    fn play_chime(&mut self) -> Result<(), FeedbackError>;

    fn celebrate(&mut self, intensity: Intensity);

    fn set_title(&mut self, title: &str);

    /// Put the application's default title back.
    fn restore_title(&mut self) {
        self.set_title(DEFAULT_TITLE);
    }
}

/// Performs the presentation subset of [`Effect`]s against a sink.
pub struct FeedbackCoordinator {
    sink: Box<dyn FeedbackSink>,
    last_title: Option<String>,
}

impl FeedbackCoordinator {
    pub fn new(sink: Box<dyn FeedbackSink>) -> Self {
        Self {
            sink,
            last_title: None,
        }
    }

    /// Returns `true` if the effect was a presentation effect.
    pub fn apply(&mut self, effect: &Effect) -> bool {
        match effect {
            Effect::PlaySound => {
                if let Err(e) = self.sink.play_chime() {
                    debug!(error = %e, "chime suppressed");
                }
            }
            Effect::Celebrate(intensity) => self.sink.celebrate(*intensity),
            Effect::SetTitle(title) => {
                if self.last_title.as_deref() != Some(title.as_str()) {
                    self.sink.set_title(title);
                    self.last_title = Some(title.clone());
                }
            }
            Effect::RestoreTitle => {
                self.sink.restore_title();
                self.last_title = None;
            }
            _ => return false,
        }
        true
    }
}
