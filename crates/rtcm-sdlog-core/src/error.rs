//! Error types for the SD logger
//!
//! This module defines all error types used throughout the crate.
//!
//! Most of these never reach a caller of the logger: mount, open and write
//! failures are logged by [`LoggerCore`](crate::LoggerCore) and the data path
//! carries on. They exist so collaborators can report what went wrong.

use thiserror::Error;

/// Result type alias for logger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the SD logger
#[derive(Error, Debug)]
pub enum Error {
    /// Storage could not be mounted
    #[error("Mount error: {0}")]
    Mount(String),

    /// A log file could not be created or opened for appending
    #[error("Open error: {0}")]
    Open(String),

    /// Fewer bytes than requested reached the log file
    ///
    /// Reported in the logger's write log; `write` itself never returns it.
    #[error("Write error: {0}")]
    Write(String),

    /// Mounted storage misbehaved (resource limits, unmount failures)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Config store errors
    #[error("Config store error: {0}")]
    ConfigStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event bus errors
    #[error("Event bus error: {0}")]
    EventBus(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a mount error
    pub fn mount(msg: impl Into<String>) -> Self {
        Self::Mount(msg.into())
    }

    /// Create an open error
    pub fn open(msg: impl Into<String>) -> Self {
        Self::Open(msg.into())
    }

    /// Create a write error
    pub fn write(msg: impl Into<String>) -> Self {
        Self::Write(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a config store error
    pub fn config_store(msg: impl Into<String>) -> Self {
        Self::ConfigStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an event bus error
    pub fn event_bus(msg: impl Into<String>) -> Self {
        Self::EventBus(msg.into())
    }
}
