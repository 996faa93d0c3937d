//! Profile hydration.

use std::fmt;
use std::sync::Arc;

use crate::error::HydrationError;
use crate::profile::Profile;
use crate::session::Session;
use crate::traits::ProfileStore;

/// Resolves a [`Profile`] from a session's subject identity.
///
/// Hydration performs one store lookup and returns the result; it never
/// touches auth state, so callers may run it redundantly.
#[derive(Clone)]
pub struct ProfileHydrator {
    store: Arc<dyn ProfileStore>,
}

impl ProfileHydrator {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Hydrate the profile for `session`.
    ///
    /// # Returns
    /// - `Ok(Some(profile))` when a provisioned record exists
    /// - `Ok(None)` when no record (or no tenant) exists for the subject
    /// - `Err(_)` when the lookup itself failed
    pub async fn hydrate(&self, session: &Session) -> Result<Option<Profile>, HydrationError> {
        tracing::debug!(subject = %session.subject_id, "hydrating profile");

        let record = self
            .store
            .find_by_subject(session)
            .await
            .map_err(|source| HydrationError::Lookup {
                subject_id: session.subject_id.clone(),
                source,
            })?;

        let Some(record) = record else {
            tracing::info!(subject = %session.subject_id, "no profile record for subject");
            return Ok(None);
        };

        let profile = Profile::from_record(session, record);
        if profile.is_none() {
            tracing::info!(subject = %session.subject_id, "profile record has no tenant");
        }
        Ok(profile)
    }
}

impl fmt::Debug for ProfileHydrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileHydrator").finish_non_exhaustive()
    }
}
