//! Core error types for focusroom-core.
//!
//! This module defines the error hierarchy using thiserror. Persistence
//! failures are recoverable at runtime; configuration failures are raised
//! before any timer can be built.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusroom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session or task store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The overlay task stopped before it could answer
    #[error("Focus overlay is no longer running")]
    OverlayClosed,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A previous holder of the connection panicked
    #[error("Database connection poisoned")]
    Poisoned,

    /// A stored value could not be decoded
    #[error("Corrupt row in '{table}': {message}")]
    CorruptRow { table: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors reported by a [`SessionStore`](crate::session::SessionStore) or
/// [`TaskStore`](crate::session::TaskStore).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the write
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The referenced session does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// The referenced task does not exist
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// The session was already ended
    #[error("Session already ended: {0}")]
    AlreadyEnded(String),

    /// Underlying database failure
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Unknown timer mode name
    #[error("Unknown timer mode: '{0}' (expected focus, short_break or long_break)")]
    UnknownMode(String),

    /// Unknown key name in a shortcut binding
    #[error("Unknown key: '{0}'")]
    UnknownKey(String),

    /// Unknown overlay command name in a shortcut binding
    #[error("Unknown command: '{0}'")]
    UnknownCommand(String),
}

/// Presentation failures (audio device missing, playback blocked).
///
/// These never leave the feedback coordinator.
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("Sound playback failed: {0}")]
    Playback(String),
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseLocked
                    || e.code == rusqlite::ErrorCode::DatabaseBusy
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(DatabaseError::from(err))
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
