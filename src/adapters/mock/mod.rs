//! Mock implementations for testing.
//!
//! In-memory doubles for the provider traits. Both can hold a reply back
//! until the test releases it, which is how the race tests pin down the
//! order in which pushed events, the current-session query, and profile
//! lookups resolve.
//!
//! # Available Mocks
//!
//! - [`MockAuthProvider`] - scriptable auth provider with event emission
//! - [`InMemoryProfileStore`] - profile records keyed by subject

pub mod provider;
pub mod store;

pub use provider::{MockAuthProvider, MOCK_INVALID_CREDENTIALS};
pub use store::InMemoryProfileStore;
