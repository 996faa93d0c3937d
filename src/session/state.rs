//! Process-wide authentication state.
//!
//! [`AuthStore`] owns the single writable copy of [`AuthState`] and hands out
//! [`AuthStateReader`]s. Only the session watcher holds the store once it has
//! started, so every write goes through its fold rules.

use tokio::sync::watch;

use crate::profile::Profile;

/// Who is signed in, and whether that is known yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub profile: Option<Profile>,
    /// Set once initial reconciliation completes; never reverts.
    pub ready: bool,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some()
    }

    /// Still waiting for the first reconciliation.
    pub fn is_loading(&self) -> bool {
        !self.ready
    }
}

/// Owner of the writable auth state.
#[derive(Debug)]
pub struct AuthStore {
    tx: watch::Sender<AuthState>,
}

impl AuthStore {
    /// Create a store in the `{profile: None, ready: false}` state.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AuthState::default());
        Self { tx }
    }

    pub fn reader(&self) -> AuthStateReader {
        AuthStateReader {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    /// Replace the profile and mark the state ready.
    pub(crate) fn publish(&self, profile: Option<Profile>) {
        self.tx.send_replace(AuthState {
            profile,
            ready: true,
        });
    }

    /// Mark ready without touching the profile.
    pub(crate) fn mark_ready(&self) {
        self.tx.send_if_modified(|state| {
            if state.ready {
                false
            } else {
                state.ready = true;
                true
            }
        });
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Read handle on the auth state.
#[derive(Debug, Clone)]
pub struct AuthStateReader {
    rx: watch::Receiver<AuthState>,
}

impl AuthStateReader {
    /// Current state.
    pub fn current(&self) -> AuthState {
        self.rx.borrow().clone()
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<AuthState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the state is ready.
    ///
    /// If the writer goes away first, returns whatever was last published.
    pub async fn wait_ready(&mut self) -> AuthState {
        if let Ok(state) = self.rx.wait_for(|state| state.ready).await {
            return state.clone();
        }
        self.current()
    }
}
