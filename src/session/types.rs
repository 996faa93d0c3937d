//! Session and auth-event types shared by providers and the watcher.

use std::fmt;

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// A provider-issued session.
///
/// Presence is expressed as `Option<Session>` everywhere; a `Session` value
/// always means "signed in".
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque subject identity assigned by the provider.
    pub subject_id: String,
    /// Email-like label of the subject.
    pub email: String,
    /// Bearer token for authenticated store requests.
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Expiry as a Unix timestamp (seconds).
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Session {
    /// Create a session with no tokens attached.
    pub fn new(subject_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            email: email.into(),
            access_token: String::new(),
            refresh_token: None,
            expires_at: None,
        }
    }

    /// Attach provider tokens.
    pub fn with_tokens(
        mut self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: Option<i64>,
    ) -> Self {
        self.access_token = access_token.into();
        self.refresh_token = refresh_token;
        self.expires_at = expires_at;
        self
    }

    /// Whether the access token has expired.
    ///
    /// A session without an expiry is treated as expired.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => chrono::Utc::now().timestamp() >= expires_at,
            None => true,
        }
    }
}

/// Tokens are redacted.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("subject_id", &self.subject_id)
            .field("email", &self.email)
            .field("access_token", &redacted(!self.access_token.is_empty()))
            .field("refresh_token", &redacted(self.refresh_token.is_some()))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

fn redacted(present: bool) -> Option<&'static str> {
    present.then_some("[redacted]")
}

/// Kind of a pushed auth event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

impl AuthEventKind {
    /// Wire name used by the provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthEventKind::InitialSession => "INITIAL_SESSION",
            AuthEventKind::SignedIn => "SIGNED_IN",
            AuthEventKind::SignedOut => "SIGNED_OUT",
            AuthEventKind::TokenRefreshed => "TOKEN_REFRESHED",
            AuthEventKind::UserUpdated => "USER_UPDATED",
            AuthEventKind::PasswordRecovery => "PASSWORD_RECOVERY",
        }
    }

    /// Parse a wire name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "INITIAL_SESSION" => Some(AuthEventKind::InitialSession),
            "SIGNED_IN" => Some(AuthEventKind::SignedIn),
            "SIGNED_OUT" => Some(AuthEventKind::SignedOut),
            "TOKEN_REFRESHED" => Some(AuthEventKind::TokenRefreshed),
            "USER_UPDATED" => Some(AuthEventKind::UserUpdated),
            "PASSWORD_RECOVERY" => Some(AuthEventKind::PasswordRecovery),
            _ => None,
        }
    }
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pushed auth event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

impl AuthEvent {
    pub fn new(kind: AuthEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    pub fn signed_in(session: Session) -> Self {
        Self::new(AuthEventKind::SignedIn, Some(session))
    }

    pub fn signed_out() -> Self {
        Self::new(AuthEventKind::SignedOut, None)
    }

    /// Subject carried by the event, if any.
    pub fn subject_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.subject_id.as_str())
    }
}

/// Release callback for a subscription.
pub type Unsubscribe = Box<dyn FnOnce() -> Result<(), ProviderError> + Send + Sync>;

/// A live subscription to a provider's auth events.
///
/// The event stream is installed when the provider hands this out, so
/// events emitted afterwards are buffered until the stream is polled.
pub struct AuthSubscription {
    events: BoxStream<'static, AuthEvent>,
    unsubscribe: Option<Unsubscribe>,
}

impl AuthSubscription {
    pub fn new<S>(events: S) -> Self
    where
        S: Stream<Item = AuthEvent> + Send + 'static,
    {
        Self {
            events: events.boxed(),
            unsubscribe: None,
        }
    }

    /// Attach a release callback run on unsubscribe.
    pub fn with_unsubscribe<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> Result<(), ProviderError> + Send + Sync + 'static,
    {
        self.unsubscribe = Some(Box::new(f));
        self
    }

    pub fn into_parts(self) -> (BoxStream<'static, AuthEvent>, Option<Unsubscribe>) {
        (self.events, self.unsubscribe)
    }
}

impl fmt::Debug for AuthSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSubscription")
            .field("has_unsubscribe", &self.unsubscribe.is_some())
            .finish()
    }
}
