//! Error types for vitalscope-core operations.
//!
//! None of these are fatal: callers surface them as a transient message and
//! keep the last good state.

use std::path::PathBuf;

use vitalscope_protocol::ErrorInfo;

/// All errors that can occur in vitalscope-core operations.
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Configuration file malformed: {path}: {details}")]
    ConfigMalformed { path: PathBuf, details: String },

    #[error("Configuration write failed: {path}: {details}")]
    ConfigWriteFailed { path: PathBuf, details: String },

    #[error("Home directory not found")]
    HomeDirNotFound,

    // ─────────────────────────────────────────────────────────────────────
    // Request Errors (rejected before anything is sent)
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    #[error("Invalid request: {code}: {message}")]
    InvalidRequest { code: String, message: String },

    #[error("No dataset selected")]
    NoSelection,

    // ─────────────────────────────────────────────────────────────────────
    // Transport Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Transport failure: {context}: {details}")]
    Transport { context: String, details: String },

    #[error("Server rejected request ({status}): {message}")]
    Server { status: u16, message: String },

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parsing error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ScopeError {
    /// True for failures of the network path, as opposed to requests the
    /// client refused to send.
    pub fn is_transport(&self) -> bool {
        matches!(self, ScopeError::Transport { .. } | ScopeError::Server { .. })
    }
}

impl From<ErrorInfo> for ScopeError {
    fn from(info: ErrorInfo) -> Self {
        match info.code.as_str() {
            "invalid_session_id" => ScopeError::InvalidSessionId(info.message),
            _ => ScopeError::InvalidRequest {
                code: info.code,
                message: info.message,
            },
        }
    }
}

/// Convenience type alias for Results using ScopeError.
pub type Result<T> = std::result::Result<T, ScopeError>;

// Conversion for string error compatibility
impl From<ScopeError> for String {
    fn from(err: ScopeError) -> String {
        err.to_string()
    }
}
