//! Tenant subscription plans.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A tenant's plan tier.
///
/// Unknown labels are kept verbatim so nothing is lost on display.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Plan {
    Pro,
    Plus,
    /// Custom contract, labelled "Personalizado" by the backend.
    Custom,
    Other(String),
}

impl Plan {
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Pro" => Plan::Pro,
            "Plus" => Plan::Plus,
            "Personalizado" => Plan::Custom,
            other => Plan::Other(other.to_string()),
        }
    }

    /// Backend label.
    pub fn label(&self) -> &str {
        match self {
            Plan::Pro => "Pro",
            Plan::Plus => "Plus",
            Plan::Custom => "Personalizado",
            Plan::Other(label) => label,
        }
    }

    /// Settings pages beyond the basic tier.
    pub fn has_professional_features(&self) -> bool {
        matches!(self, Plan::Pro | Plan::Plus | Plan::Custom)
    }

    /// PDF report export.
    pub fn has_report_export(&self) -> bool {
        matches!(self, Plan::Plus | Plan::Custom)
    }
}

impl From<String> for Plan {
    fn from(label: String) -> Self {
        Plan::from_label(&label)
    }
}

impl From<Plan> for String {
    fn from(plan: Plan) -> Self {
        plan.label().to_string()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label() {
        assert_eq!(Plan::from_label("Pro"), Plan::Pro);
        assert_eq!(Plan::from_label(" Plus "), Plan::Plus);
        assert_eq!(Plan::from_label("Personalizado"), Plan::Custom);
        assert_eq!(Plan::from_label("Basico"), Plan::Other("Basico".to_string()));
    }

    #[test]
    fn test_feature_gates() {
        assert!(Plan::Pro.has_professional_features());
        assert!(!Plan::Pro.has_report_export());
        assert!(Plan::Plus.has_report_export());
        assert!(Plan::Custom.has_report_export());
        let basic = Plan::Other("Basico".to_string());
        assert!(!basic.has_professional_features());
        assert!(!basic.has_report_export());
    }

    #[test]
    fn test_serde_uses_label() {
        assert_eq!(serde_json::to_string(&Plan::Custom).unwrap(), "\"Personalizado\"");
        let plan: Plan = serde_json::from_str("\"Plus\"").unwrap();
        assert_eq!(plan, Plan::Plus);
    }
}
