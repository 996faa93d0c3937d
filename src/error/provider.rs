//! Errors surfaced by the authentication provider.

use thiserror::Error;

/// Fallback shown when the provider gives no message of its own.
const GENERIC_SIGN_IN_MESSAGE: &str = "Authentication failed";

/// Authentication provider errors.
///
/// Credential rejections keep the provider's own wording so that
/// [`ProviderError::user_message`] can hand it to the user unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider rejected the email/password pair or refresh token.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The stored session expired and could not be renewed.
    #[error("Session expired")]
    SessionExpired,

    /// The request never produced an HTTP response.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The provider answered with a body we could not interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Human-readable message for the sign-in boundary.
    ///
    /// Credential and server messages come from the provider verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ProviderError::InvalidCredentials(message) if !message.is_empty() => message.clone(),
            ProviderError::InvalidCredentials(_) => GENERIC_SIGN_IN_MESSAGE.to_string(),
            ProviderError::SessionExpired => {
                "Your session has expired. Please sign in again.".to_string()
            }
            ProviderError::Transport(_) => {
                "Could not reach the authentication server. Check your connection.".to_string()
            }
            ProviderError::Server { message, .. } if !message.is_empty() => message.clone(),
            ProviderError::Server { status, .. } => {
                format!("{} (status {})", GENERIC_SIGN_IN_MESSAGE, status)
            }
            ProviderError::InvalidResponse(_) => {
                "The authentication server sent an unexpected response.".to_string()
            }
        }
    }

    /// Short code for log lines.
    pub fn error_code(&self) -> &'static str {
        match self {
            ProviderError::InvalidCredentials(_) => "E_AUTH_INVALID",
            ProviderError::SessionExpired => "E_AUTH_EXPIRED",
            ProviderError::Transport(_) => "E_AUTH_TRANSPORT",
            ProviderError::Server { .. } => "E_AUTH_SERVER",
            ProviderError::InvalidResponse(_) => "E_AUTH_RESPONSE",
        }
    }

    /// Whether repeating the same call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
