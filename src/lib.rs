//! tenantdash - session synchronization core for a multi-tenant dashboard
//!
//! Keeps "who is signed in" consistent between a hosted auth provider's
//! event stream and its current-session query, and hydrates the signed-in
//! user's tenant profile.
//!
//! This library exposes modules for use by the binary and integration tests.

pub mod adapters;
pub mod config;
pub mod error;
pub mod profile;
pub mod session;
pub mod traits;

pub use profile::{Plan, Profile, ProfileHydrator, ProfileRecord};
pub use session::{
    AuthEvent, AuthEventKind, AuthState, AuthStateReader, AuthStore, Session, SessionWatcher,
    WatcherHandle,
};
