//! Scriptable auth provider for testing.

use async_trait::async_trait;
use futures::stream;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

use crate::error::ProviderError;
use crate::session::{AuthEvent, AuthEventKind, AuthSubscription, Session};
use crate::traits::AuthProvider;

/// Message returned for unknown accounts or wrong passwords.
pub const MOCK_INVALID_CREDENTIALS: &str = "Invalid login credentials";

type SessionReply = Result<Option<Session>, ProviderError>;

#[derive(Debug, Default)]
struct ProviderState {
    subscribers: Vec<mpsc::UnboundedSender<AuthEvent>>,
    current: Option<Session>,
    current_error: Option<ProviderError>,
    deferred: VecDeque<oneshot::Receiver<SessionReply>>,
    accounts: HashMap<String, (String, Session)>,
    sign_out_error: Option<ProviderError>,
    unsubscribe_error: Option<ProviderError>,
    calls: Vec<&'static str>,
    unsubscribes: usize,
}

/// Auth provider double.
///
/// # Example
///
/// ```ignore
/// use tenantdash::adapters::mock::MockAuthProvider;
///
/// let provider = MockAuthProvider::new();
/// let reply = provider.defer_current_session();
/// // ... start a watcher, emit events ...
/// provider.emit(AuthEvent::signed_in(session));
/// reply.send(Ok(None)).unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockAuthProvider {
    state: Arc<Mutex<ProviderState>>,
}

impl MockAuthProvider {
    /// Create a provider with no session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider whose current session is `session`.
    pub fn with_session(session: Session) -> Self {
        let provider = Self::new();
        provider.set_current_session(Some(session));
        provider
    }

    pub fn set_current_session(&self, session: Option<Session>) {
        let mut state = self.state.lock().unwrap();
        state.current = session;
        state.current_error = None;
    }

    /// Make the current-session query fail.
    pub fn fail_current_session(&self, err: ProviderError) {
        self.state.lock().unwrap().current_error = Some(err);
    }

    /// Hold the next current-session query until the returned sender fires.
    ///
    /// Dropping the sender makes the query fail with a transport error.
    pub fn defer_current_session(&self) -> oneshot::Sender<SessionReply> {
        let (tx, rx) = oneshot::channel();
        self.state.lock().unwrap().deferred.push_back(rx);
        tx
    }

    /// Register an account accepted by `sign_in_with_password`.
    pub fn add_account(&self, email: &str, password: &str, session: Session) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(email.to_string(), (password.to_string(), session));
    }

    /// Make `sign_out` report an error (local state is still cleared).
    pub fn fail_sign_out(&self, err: ProviderError) {
        self.state.lock().unwrap().sign_out_error = Some(err);
    }

    /// Make the subscription's release callback report an error.
    pub fn fail_unsubscribe(&self, err: ProviderError) {
        self.state.lock().unwrap().unsubscribe_error = Some(err);
    }

    /// Push an event to every live subscriber. Returns how many received it.
    pub fn emit(&self, event: AuthEvent) -> usize {
        let mut state = self.state.lock().unwrap();
        state.subscribers.retain(|tx| !tx.is_closed());
        state
            .subscribers
            .iter()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Subscribers whose stream is still alive.
    pub fn subscriber_count(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .subscribers
            .iter()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.state.lock().unwrap().unsubscribes
    }

    /// Names of the trait methods called so far, in order.
    pub fn call_log(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: &'static str) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    fn subscribe(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut state = self.state.lock().unwrap();
            state.calls.push("subscribe");
            state.subscribers.push(tx);
        }

        let events = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });
        let state = Arc::clone(&self.state);
        AuthSubscription::new(events).with_unsubscribe(move || {
            let mut state = state.lock().unwrap();
            state.unsubscribes += 1;
            match state.unsubscribe_error.clone() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }

    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        let deferred = {
            let mut state = self.state.lock().unwrap();
            state.calls.push("current_session");
            match state.deferred.pop_front() {
                Some(rx) => rx,
                None => {
                    return match &state.current_error {
                        Some(err) => Err(err.clone()),
                        None => Ok(state.current.clone()),
                    };
                }
            }
        };

        match deferred.await {
            Ok(reply) => reply,
            Err(_) => Err(ProviderError::Transport("mock reply dropped".to_string())),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError> {
        let session = {
            let mut state = self.state.lock().unwrap();
            state.calls.push("sign_in_with_password");
            match state.accounts.get(email) {
                Some((expected, session)) if expected == password => session.clone(),
                _ => {
                    return Err(ProviderError::InvalidCredentials(
                        MOCK_INVALID_CREDENTIALS.to_string(),
                    ))
                }
            }
        };

        self.state.lock().unwrap().current = Some(session.clone());
        self.emit(AuthEvent::new(AuthEventKind::SignedIn, Some(session.clone())));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.record("sign_out");
        let error = {
            let mut state = self.state.lock().unwrap();
            state.current = None;
            state.sign_out_error.clone()
        };

        self.emit(AuthEvent::signed_out());
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
