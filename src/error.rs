use std::io;
use thiserror::Error;

/// Custom error type for procwatch
#[derive(Error, Debug)]
pub enum ProcwatchError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Process {0} not found")]
    ProcessNotFound(u32),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for procwatch
pub type Result<T> = std::result::Result<T, ProcwatchError>;

impl ProcwatchError {
    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ProcwatchError::Config(msg.into())
    }

    /// Create a permission denied error
    pub fn permission_denied<S: Into<String>>(msg: S) -> Self {
        ProcwatchError::PermissionDenied(msg.into())
    }

    pub fn runtime<S: Into<String>>(msg: S) -> Self {
        ProcwatchError::Runtime(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        ProcwatchError::Other(msg.into())
    }
}
