/// Unified error types for the Vidharbor system.
use thiserror::Error;

/// Top-level error type for Vidharbor operations.
///
/// Engine messages are carried verbatim so callers can surface them as-is.
#[derive(Debug, Error)]
pub enum VidharborError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{message}")]
    ExtractionFailed { message: String },

    #[error("{message}")]
    DownloadFailed { message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VidharborError {
    pub fn invalid(message: impl Into<String>) -> Self {
        VidharborError::InvalidRequest(message.into())
    }
}

/// Errors raised while invoking the external extraction/merge engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to spawn {bin}: {reason}")]
    Spawn { bin: String, reason: String },

    #[error("{stderr}")]
    Failed { stderr: String },

    #[error("Engine returned invalid output: {0}")]
    InvalidOutput(String),

    #[error("Engine timed out after {0}s")]
    Timeout(u64),
}

/// Reasons the history file could not be loaded.
///
/// Never surfaced over HTTP: the read policy treats both as an empty history.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history file unreadable: {0}")]
    Unreadable(#[source] std::io::Error),

    #[error("history file corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
}

/// Result type alias for Vidharbor operations.
pub type VidharborResult<T> = Result<T, VidharborError>;
