//! Error types for the session core.
//!
//! Errors are split by the collaborator that produces them:
//!
//! | Type | Produced by | Folded into AuthState as |
//! |------|-------------|--------------------------|
//! | [`ProviderError`] | auth provider calls | absent profile / sign-in message |
//! | [`StoreError`] | profile record lookup | absent profile |
//! | [`HydrationError`] | [`crate::profile::ProfileHydrator`] | absent profile |
//! | [`ConfigError`] | [`crate::config::ClientConfig`] | never reaches AuthState |
//! | [`SessionFileError`] | [`crate::adapters::SessionFile`] | logged, never folded |
//!
//! Nothing in this crate lets these escape into state readers; they are
//! logged at the fold site and turned into a defined state value.

mod config;
mod provider;
mod store;

pub use config::{ConfigError, SessionFileError};
pub use provider::ProviderError;
pub use store::{HydrationError, StoreError};
