//! Trait abstractions for the external auth and data provider.
//!
//! The session core only talks to the hosted backend through these traits,
//! so the watcher can be driven by the REST adapter in production and by the
//! in-memory mocks in tests.
//!
//! # Traits
//!
//! - [`AuthProvider`] - auth event subscription, current session, credentials
//! - [`ProfileStore`] - tenant-scoped user record lookup

pub mod auth_provider;
pub mod profile_store;

pub use auth_provider::AuthProvider;
pub use profile_store::ProfileStore;
