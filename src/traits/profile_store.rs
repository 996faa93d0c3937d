//! Profile store trait abstraction.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::profile::ProfileRecord;
use crate::session::Session;

/// Trait for the tenant-scoped user record lookup.
///
/// The record is keyed by `session.subject_id`; the session is passed whole
/// so that stores needing the bearer token can authenticate the query.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up the record joined with its tenant.
    ///
    /// # Returns
    /// - `Ok(Some(record))` if a record exists for the subject
    /// - `Ok(None)` if none exists
    /// - `Err(error)` if the lookup failed
    async fn find_by_subject(&self, session: &Session) -> Result<Option<ProfileRecord>, StoreError>;
}
