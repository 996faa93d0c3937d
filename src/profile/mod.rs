//! Domain profile resolved from a session.
//!
//! A [`Profile`] joins the provider's subject identity with the tenant-scoped
//! user record and its tenant. Profiles are built only by
//! [`ProfileHydrator`] and never change after construction.

mod hydrator;
mod plan;

pub use hydrator::ProfileHydrator;
pub use plan::Plan;

use serde::{Deserialize, Serialize};

use crate::session::Session;

/// Tenant-scoped user record as returned by a [`crate::traits::ProfileStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub tenant_id: Option<String>,
    pub tenant_name: Option<String>,
    pub plan: Option<String>,
}

/// A hydrated user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub subject_id: String,
    pub email: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub plan: Option<Plan>,
}

impl Profile {
    /// Join a session with its record.
    ///
    /// Returns `None` when the record has no tenant: the account exists at
    /// the provider but has not been provisioned yet.
    pub(crate) fn from_record(session: &Session, record: ProfileRecord) -> Option<Self> {
        let tenant_id = record.tenant_id.filter(|id| !id.trim().is_empty())?;

        Some(Self {
            subject_id: session.subject_id.clone(),
            email: session.email.clone(),
            tenant_id,
            tenant_name: record.tenant_name.unwrap_or_default(),
            display_name: record.display_name,
            role: record.role,
            plan: record.plan.as_deref().map(Plan::from_label),
        })
    }

    /// Name to greet the user with, falling back to the email.
    pub fn greeting_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}
