mod config;
pub mod database;

pub use config::{Config, NotificationsConfig, ShortcutsConfig, TimerConfig, UserConfig};
pub use database::{Database, TaskRecord};

use std::path::PathBuf;

/// Returns `~/.config/focusroom[-dev]/` based on FOCUSROOM_ENV.
///
/// Set FOCUSROOM_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("FOCUSROOM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("focusroom-dev")
    } else {
        base_dir.join("focusroom")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
