//! Common test utilities for integration tests.
//!
//! Fixtures for sessions and profile records, and a [`Harness`] that wires a
//! [`SessionWatcher`] to the in-memory mocks.
//!
//! # Example
//!
//! ```ignore
//! let harness = Harness::new();
//! harness.store.insert("u-1", record_for("u-1"));
//! let handle = harness.start();
//! ```

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tenantdash::adapters::mock::{InMemoryProfileStore, MockAuthProvider};
use tenantdash::{AuthState, AuthStore, Plan, Profile, ProfileRecord, Session, SessionWatcher, WatcherHandle};

/// Creates a session for `subject` with tokens that won't expire during tests.
pub fn session(subject: &str) -> Session {
    Session::new(subject, format!("{}@example.com", subject)).with_tokens(
        format!("access-{}", subject),
        Some(format!("refresh-{}", subject)),
        Some(i64::MAX),
    )
}

/// Creates the provisioned record for `subject`.
pub fn record_for(subject: &str) -> ProfileRecord {
    ProfileRecord {
        display_name: Some(format!("User {}", subject)),
        role: Some("owner".to_string()),
        tenant_id: Some(format!("tenant-{}", subject)),
        tenant_name: Some(format!("Tenant {}", subject)),
        plan: Some("Plus".to_string()),
    }
}

/// The profile hydration of `session(subject)` with `record_for(subject)`.
pub fn profile_for(subject: &str) -> Profile {
    Profile {
        subject_id: subject.to_string(),
        email: format!("{}@example.com", subject),
        tenant_id: format!("tenant-{}", subject),
        tenant_name: format!("Tenant {}", subject),
        display_name: Some(format!("User {}", subject)),
        role: Some("owner".to_string()),
        plan: Some(Plan::Plus),
    }
}

/// Mock provider and store shared with a watcher under test.
pub struct Harness {
    pub provider: MockAuthProvider,
    pub store: InMemoryProfileStore,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            provider: MockAuthProvider::new(),
            store: InMemoryProfileStore::new(),
        }
    }

    /// Harness with provisioned records for each subject.
    pub fn with_records(subjects: &[&str]) -> Self {
        let harness = Self::new();
        for subject in subjects {
            harness.store.insert(subject, record_for(subject));
        }
        harness
    }

    pub fn start(&self) -> WatcherHandle {
        SessionWatcher::new(
            Arc::new(self.provider.clone()),
            Arc::new(self.store.clone()),
            AuthStore::new(),
        )
        .start()
    }
}

/// Let spawned tasks run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

/// Wait for the handle's state to become ready.
pub async fn ready(handle: &WatcherHandle) -> AuthState {
    let mut reader = handle.state();
    tokio::time::timeout(Duration::from_secs(5), reader.wait_ready())
        .await
        .expect("auth state should become ready")
}

/// Signed-out, ready state.
pub fn signed_out() -> AuthState {
    AuthState {
        profile: None,
        ready: true,
    }
}

/// Signed-in, ready state for `subject`.
pub fn signed_in(subject: &str) -> AuthState {
    AuthState {
        profile: Some(profile_for(subject)),
        ready: true,
    }
}
