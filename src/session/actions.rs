//! Credential exchange actions on a running watcher.
//!
//! Both actions fold through the watcher so it stays the only writer of
//! auth state. Neither returns a structured error: sign-in hands back a
//! message fit for display, sign-out always succeeds locally.

use super::watcher::{Origin, WatcherHandle};
use crate::profile::Profile;

/// Shown when credentials were accepted but no provisioned record exists.
pub const USER_DATA_NOT_FOUND: &str = "User data not found";

impl WatcherHandle {
    /// Sign in with email and password.
    ///
    /// On success the hydrated profile is folded into auth state and
    /// returned. The provider's `SIGNED_IN` echo for the same subject does
    /// not supersede this fold. A credential rejection returns the
    /// provider's message and leaves auth state untouched.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Profile, String> {
        tracing::info!(email, "signing in");

        let session = match self.core.provider.sign_in_with_password(email, password).await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(code = err.error_code(), error = %err, "sign-in rejected");
                return Err(err.user_message());
            }
        };

        let generation = self.core.begin_sign_in(&session.subject_id);
        match self.core.hydrator.hydrate(&session).await {
            Ok(Some(profile)) => {
                self.core
                    .fold(&self.token, generation, Some(profile.clone()), Origin::SignIn);
                Ok(profile)
            }
            Ok(None) => {
                self.core.fold(&self.token, generation, None, Origin::SignIn);
                Err(USER_DATA_NOT_FOUND.to_string())
            }
            Err(err) => {
                tracing::warn!(error = %err, "profile hydration failed after sign-in");
                self.core.fold(&self.token, generation, None, Origin::SignIn);
                Err(USER_DATA_NOT_FOUND.to_string())
            }
        }
    }

    /// Sign out at the provider and clear auth state.
    ///
    /// The state is cleared even if the provider call fails.
    pub async fn sign_out(&self) {
        if let Err(err) = self.core.provider.sign_out().await {
            tracing::warn!(code = err.error_code(), error = %err, "provider sign-out failed; clearing local state anyway");
        }

        let generation = self.core.next_generation();
        self.core.fold(&self.token, generation, None, Origin::SignOut);
    }
}
