use std::sync::{Arc, Mutex};

use super::{FeedbackSink, Intensity, DEFAULT_TITLE};
use crate::error::FeedbackError;

/// One call received by a [`RecordingFeedback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackCall {
    Chime,
    Celebrate(Intensity),
    SetTitle(String),
}

/// Sink that records every call. Clones share the same log, so a host can
/// hand one clone to the overlay and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingFeedback {
    calls: Arc<Mutex<Vec<FeedbackCall>>>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<FeedbackCall> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    pub fn chime_count(&self) -> usize {
        self.count(|c| matches!(c, FeedbackCall::Chime))
    }

    pub fn celebrations(&self, intensity: Intensity) -> usize {
        self.count(|c| *c == FeedbackCall::Celebrate(intensity))
    }

    /// Most recent title, or the default if none was set.
    pub fn current_title(&self) -> String {
        self.calls()
            .into_iter()
            .rev()
            .find_map(|c| match c {
                FeedbackCall::SetTitle(t) => Some(t),
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    fn count(&self, pred: impl Fn(&FeedbackCall) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn push(&self, call: FeedbackCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl FeedbackSink for RecordingFeedback {
    fn play_chime(&mut self) -> Result<(), FeedbackError> {
        self.push(FeedbackCall::Chime);
        Ok(())
    }

    fn celebrate(&mut self, intensity: Intensity) {
        self.push(FeedbackCall::Celebrate(intensity));
    }

    fn set_title(&mut self, title: &str) {
        self.push(FeedbackCall::SetTitle(title.to_string()));
    }
}
