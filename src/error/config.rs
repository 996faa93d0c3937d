//! Configuration and local session storage errors.

use thiserror::Error;

/// Errors building a [`crate::config::ClientConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    /// The backend URL does not parse.
    #[error("Invalid backend URL '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },

    /// A numeric setting does not parse.
    #[error("Invalid value '{value}' for {name}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Errors reading or writing the persisted session file.
#[derive(Debug, Error)]
pub enum SessionFileError {
    #[error("Session file IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
