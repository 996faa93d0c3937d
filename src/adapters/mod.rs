//! Concrete implementations of the provider traits.
//!
//! # Adapters
//!
//! - [`RestClient`] - hosted backend over HTTP (auth + profile table)
//! - [`SessionFile`] - JSON file persistence for the current session
//!
//! # Mock Implementations
//!
//! The [`mock`] submodule provides in-memory doubles:
//! - [`mock::MockAuthProvider`] - scriptable events, sessions and credentials
//! - [`mock::InMemoryProfileStore`] - records keyed by subject

pub mod mock;
pub mod rest;
pub mod session_file;

pub use mock::{InMemoryProfileStore, MockAuthProvider};
pub use rest::RestClient;
pub use session_file::SessionFile;
