//! Auth provider trait abstraction.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::session::{AuthSubscription, Session};

/// Trait for the external authentication provider.
///
/// # Example
///
/// ```ignore
/// use tenantdash::traits::AuthProvider;
///
/// async fn who<P: AuthProvider>(provider: &P) -> Result<Option<String>, ProviderError> {
///     Ok(provider.current_session().await?.map(|s| s.email))
/// }
/// ```
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Install a listener for auth events.
    ///
    /// The listener must be live when this returns: events emitted after the
    /// call are delivered through the returned stream.
    fn subscribe(&self) -> AuthSubscription;

    /// Resolve the current session.
    ///
    /// # Returns
    /// - `Ok(Some(session))` if signed in
    /// - `Ok(None)` if signed out
    /// - `Err(error)` if the provider could not answer
    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Exchange an email/password pair for a session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ProviderError>;

    /// End the current session at the provider.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}
