//! Session watcher.
//!
//! Reconciles two unordered sources of truth from the auth provider into
//! [`AuthState`](super::AuthState):
//!
//! ```text
//!   subscribe() ──► event loop ──┐
//!                                ├──► hydrate ──► fold ──► AuthStore
//!   current_session() ──► pull ──┘
//! ```
//!
//! # Fold rules
//!
//! Every presence-bearing signal takes a generation when it arrives. The pull
//! query is generation 0, older than any pushed event, because it was issued
//! right after the listener was installed. A fold lands only if the watcher
//! is not disposed and its generation is still the newest one; the check and
//! the write happen under one lock.
//!
//! Events without a session (other than `SIGNED_OUT`) carry no presence
//! information: they only mark the state ready.
//!
//! A sign-in through the handle registers its generation together with the
//! subject. The provider's own `SIGNED_IN` echo for that subject is absorbed
//! by the sign-in instead of superseding it, as long as no other signal
//! arrived in between.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::state::{AuthState, AuthStateReader, AuthStore};
use super::token::DisposalToken;
use super::types::{AuthEvent, AuthEventKind, Session, Unsubscribe};
use crate::profile::{Profile, ProfileHydrator};
use crate::traits::{AuthProvider, ProfileStore};

/// Generation of the initial current-session query.
const PULL_GENERATION: u64 = 0;

/// Where a fold came from, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Origin {
    Pull,
    Push(AuthEventKind),
    SignIn,
    SignOut,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Pull => f.write_str("current_session"),
            Origin::Push(kind) => write!(f, "event:{}", kind),
            Origin::SignIn => f.write_str("sign_in"),
            Origin::SignOut => f.write_str("sign_out"),
        }
    }
}

/// Sign-in whose provider echo has not been seen yet.
struct PendingSignIn {
    generation: u64,
    subject_id: String,
}

struct Gate {
    store: AuthStore,
    /// Newest generation handed out.
    latest: u64,
    sign_in: Option<PendingSignIn>,
}

impl Gate {
    fn advance(&mut self) -> u64 {
        self.latest += 1;
        self.sign_in = None;
        self.latest
    }
}

/// State shared by the watcher's tasks and its handle.
pub(super) struct Core {
    pub(super) provider: Arc<dyn AuthProvider>,
    pub(super) hydrator: ProfileHydrator,
    gate: Mutex<Gate>,
}

impl Core {
    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new presence-bearing signal.
    pub(super) fn next_generation(&self) -> u64 {
        self.gate().advance()
    }

    /// Register a sign-in for `subject_id` as a new presence-bearing signal.
    pub(super) fn begin_sign_in(&self, subject_id: &str) -> u64 {
        let mut gate = self.gate();
        let generation = gate.advance();
        gate.sign_in = Some(PendingSignIn {
            generation,
            subject_id: subject_id.to_string(),
        });
        generation
    }

    /// Generation for a pushed event carrying `session`, or `None` when the
    /// event is the echo of the sign-in that is still the newest signal.
    fn claim_event(&self, kind: AuthEventKind, session: &Session) -> Option<u64> {
        let mut gate = self.gate();
        let latest = gate.latest;
        let is_echo = kind == AuthEventKind::SignedIn
            && gate.sign_in.as_ref().is_some_and(|pending| {
                pending.generation == latest && pending.subject_id == session.subject_id
            });

        if is_echo {
            gate.sign_in = None;
            None
        } else {
            Some(gate.advance())
        }
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.gate().latest != generation
    }

    fn snapshot(&self) -> AuthState {
        self.gate().store.snapshot()
    }

    /// Apply a resolved profile if the signal is still current.
    ///
    /// Returns whether the state was written.
    pub(super) fn fold(
        &self,
        token: &DisposalToken,
        generation: u64,
        profile: Option<Profile>,
        origin: Origin,
    ) -> bool {
        let gate = self.gate();

        if token.is_disposed() {
            tracing::debug!(%origin, "watcher disposed; discarding result");
            return false;
        }
        if gate.latest != generation {
            tracing::debug!(
                %origin,
                generation,
                latest = gate.latest,
                "superseded by a newer signal; discarding result"
            );
            return false;
        }

        match &profile {
            Some(p) => tracing::info!(%origin, subject = %p.subject_id, tenant = %p.tenant_id, "signed in"),
            None => tracing::info!(%origin, "signed out"),
        }
        gate.store.publish(profile);
        true
    }

    fn mark_ready(&self, token: &DisposalToken) {
        let gate = self.gate();
        if !token.is_disposed() {
            gate.store.mark_ready();
        }
    }

    async fn hydrate_and_fold(
        self: Arc<Self>,
        token: DisposalToken,
        generation: u64,
        session: Session,
        origin: Origin,
    ) {
        let profile = match self.hydrator.hydrate(&session).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(%origin, error = %err, "profile hydration failed; treating as signed out");
                None
            }
        };
        self.fold(&token, generation, profile, origin);
    }

    fn handle_event(self: &Arc<Self>, token: &DisposalToken, event: AuthEvent) {
        let origin = Origin::Push(event.kind);
        tracing::debug!(
            event = %event.kind,
            subject = event.subject_id().unwrap_or("-"),
            "auth event received"
        );

        match (event.kind, event.session) {
            (AuthEventKind::SignedOut, _) => {
                let generation = self.next_generation();
                self.fold(token, generation, None, origin);
            }
            (kind, Some(session)) => {
                let Some(generation) = self.claim_event(kind, &session) else {
                    tracing::debug!(subject = %session.subject_id, "sign-in echo absorbed by pending sign-in");
                    return;
                };
                tokio::spawn(Arc::clone(self).hydrate_and_fold(
                    token.clone(),
                    generation,
                    session,
                    origin,
                ));
            }
            (_, None) => self.mark_ready(token),
        }
    }

    async fn reconcile_pull(self: Arc<Self>, token: DisposalToken) {
        let result = self.provider.current_session().await;

        if token.is_disposed() {
            tracing::debug!("watcher disposed before current session resolved");
            return;
        }
        if self.is_superseded(PULL_GENERATION) {
            tracing::debug!("current session superseded by a pushed event");
            return;
        }

        match result {
            Ok(Some(session)) => {
                self.hydrate_and_fold(token, PULL_GENERATION, session, Origin::Pull)
                    .await
            }
            Ok(None) => {
                self.fold(&token, PULL_GENERATION, None, Origin::Pull);
            }
            Err(err) => {
                tracing::warn!(code = err.error_code(), error = %err, "current session query failed");
                self.fold(&token, PULL_GENERATION, None, Origin::Pull);
            }
        }
    }
}

async fn run_events(
    core: Arc<Core>,
    token: DisposalToken,
    mut events: BoxStream<'static, AuthEvent>,
) {
    while let Some(event) = events.next().await {
        if token.is_disposed() {
            break;
        }
        core.handle_event(&token, event);
    }
    tracing::debug!("auth event stream ended");
}

/// Keeps [`AuthState`] in sync with the auth provider.
///
/// # Example
///
/// ```ignore
/// let store = AuthStore::new();
/// let handle = SessionWatcher::new(provider, profiles, store).start();
/// let state = handle.state().wait_ready().await;
/// // ... on teardown
/// handle.dispose();
/// ```
pub struct SessionWatcher {
    provider: Arc<dyn AuthProvider>,
    hydrator: ProfileHydrator,
    store: AuthStore,
}

impl SessionWatcher {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        profiles: Arc<dyn ProfileStore>,
        store: AuthStore,
    ) -> Self {
        Self {
            provider,
            hydrator: ProfileHydrator::new(profiles),
            store,
        }
    }

    /// Reader on the state this watcher will drive.
    pub fn reader(&self) -> AuthStateReader {
        self.store.reader()
    }

    /// Subscribe to auth events, then issue the current-session query.
    ///
    /// Must be called from within a tokio runtime. The store moves into the
    /// watcher, which becomes its only writer.
    pub fn start(self) -> WatcherHandle {
        let token = DisposalToken::new();
        let reader = self.store.reader();
        let core = Arc::new(Core {
            provider: self.provider,
            hydrator: self.hydrator,
            gate: Mutex::new(Gate {
                store: self.store,
                latest: PULL_GENERATION,
                sign_in: None,
            }),
        });

        let (events, unsubscribe) = core.provider.subscribe().into_parts();
        let events_task = tokio::spawn(run_events(Arc::clone(&core), token.clone(), events));
        tokio::spawn(Arc::clone(&core).reconcile_pull(token.clone()));

        tracing::info!("session watcher started");

        WatcherHandle {
            core,
            token,
            reader,
            events_task: Some(events_task),
            unsubscribe,
        }
    }
}

impl fmt::Debug for SessionWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionWatcher")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

/// Handle on a running watcher.
///
/// Disposing (or dropping) the handle stops all further state writes and
/// releases the subscription. Pending hydrations finish on their own and
/// their results are discarded.
pub struct WatcherHandle {
    pub(super) core: Arc<Core>,
    pub(super) token: DisposalToken,
    reader: AuthStateReader,
    events_task: Option<JoinHandle<()>>,
    unsubscribe: Option<Unsubscribe>,
}

impl WatcherHandle {
    pub fn state(&self) -> AuthStateReader {
        self.reader.clone()
    }

    pub fn snapshot(&self) -> AuthState {
        self.core.snapshot()
    }

    pub fn is_disposed(&self) -> bool {
        self.token.is_disposed()
    }

    /// Stop the watcher.
    pub fn dispose(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.token.is_disposed() {
            return;
        }

        {
            // Taking the gate waits out a fold in progress.
            let _gate = self.core.gate();
            self.token.dispose();
        }

        if let Some(task) = self.events_task.take() {
            task.abort();
        }
        if let Some(unsubscribe) = self.unsubscribe.take() {
            if let Err(err) = unsubscribe() {
                tracing::debug!(error = %err, "unsubscribe failed; ignoring");
            }
        }

        tracing::info!("session watcher disposed");
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle")
            .field("disposed", &self.token.is_disposed())
            .finish_non_exhaustive()
    }
}
