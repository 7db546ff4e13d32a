//! selrelay Error Types
//!
//! Centralized error handling for daemon and popup.

use thiserror::Error;

/// Central error type for selrelay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Selection source error: {0}")]
    Source(String),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Handoff error: {0}")]
    Handoff(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for selrelay operations
pub type RelayResult<T> = Result<T, RelayError>;
