//! Errors from the profile record lookup and from hydration.

use thiserror::Error;

/// Profile store lookup errors.
///
/// "No record" is not an error; stores return `Ok(None)` for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The request never produced an HTTP response.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The store answered with a non-success status.
    #[error("Store error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The store answered with rows we could not decode.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A failed hydration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HydrationError {
    /// The secondary lookup failed for this subject.
    #[error("Profile lookup failed for {subject_id}: {source}")]
    Lookup {
        subject_id: String,
        #[source]
        source: StoreError,
    },
}

impl HydrationError {
    /// Subject whose hydration failed.
    pub fn subject_id(&self) -> &str {
        match self {
            HydrationError::Lookup { subject_id, .. } => subject_id,
        }
    }
}
