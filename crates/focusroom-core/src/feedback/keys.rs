use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::overlay::OverlayCommand;
use crate::storage::ShortcutsConfig;
use crate::timer::TimerMode;

/// A key press, reduced to what the overlay cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Space,
    Escape,
    Enter,
}

impl FromStr for Key {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "space" => Ok(Key::Space),
            "esc" | "escape" => Ok(Key::Escape),
            "enter" | "return" => Ok(Key::Enter),
            _ => {
                let mut chars = lower.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Key::Char(c)),
                    _ => Err(ValidationError::UnknownKey(s.to_string())),
                }
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Space => f.write_str("space"),
            Key::Escape => f.write_str("escape"),
            Key::Enter => f.write_str("enter"),
        }
    }
}

/// Where keyboard focus currently is in the host UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFocus {
    Overlay,
    /// A text field (task title, note, search). Shortcuts are disabled.
    TextInput,
}

/// Key to command map for the open overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    map: HashMap<Key, OverlayCommand>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let map = HashMap::from([
            (Key::Space, OverlayCommand::Toggle),
            (Key::Char('r'), OverlayCommand::Reset),
            (Key::Escape, OverlayCommand::Close),
            (Key::Char('s'), OverlayCommand::Skip),
            (Key::Char('m'), OverlayCommand::ToggleSound),
            (Key::Char('c'), OverlayCommand::CompleteTask),
            (Key::Char('1'), OverlayCommand::SwitchMode(TimerMode::Focus)),
            (Key::Char('2'), OverlayCommand::SwitchMode(TimerMode::ShortBreak)),
            (Key::Char('3'), OverlayCommand::SwitchMode(TimerMode::LongBreak)),
        ]);
        Self { map }
    }
}

impl KeyBindings {
    /// Defaults overlaid with `command = "key"` pairs from configuration.
    /// A rebound command loses its default key.
    ///
    /// # Errors
    /// Returns an error for an unknown command or key name.
    pub fn from_config(config: &ShortcutsConfig) -> Result<Self, ValidationError> {
        let mut bindings = Self::default();
        for (command, key) in &config.bindings {
            let command: OverlayCommand = command.parse()?;
            let key: Key = key.parse()?;
            bindings.bind(key, command);
        }
        Ok(bindings)
    }

    pub fn bind(&mut self, key: Key, command: OverlayCommand) {
        self.map.retain(|_, c| *c != command);
        self.map.insert(key, command);
    }

    /// The command for `key`, unless focus is in a text input.
    pub fn resolve(&self, key: Key, focus: InputFocus) -> Option<OverlayCommand> {
        if focus == InputFocus::TextInput {
            return None;
        }
        let key = match key {
            Key::Char(c) => Key::Char(c.to_ascii_lowercase()),
            other => other,
        };
        self.map.get(&key).copied()
    }

    /// Bindings sorted by command name, for help output.
    pub fn entries(&self) -> Vec<(Key, OverlayCommand)> {
        let mut entries: Vec<_> = self.map.iter().map(|(k, c)| (*k, *c)).collect();
        entries.sort_by_key(|(_, c)| c.name());
        entries
    }
}
