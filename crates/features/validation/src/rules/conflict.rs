use crate::error::ValidationError;
use crate::rule::{RuleMetadata, ValidationRule};
use fstone_domain::constants::{
    ADVANCED_ANALYTICS, CLASSIC_LAYOUT, ENHANCED_NAVIGATION, KEYBOARD_SHORTCUTS, MOBILE_OPTIMIZATION,
    PERFORMANCE_MODE, PERSONALIZED_DASHBOARD,
};
use fstone_domain::{Severity, SystemSnapshot, ValidationIssue};

/// A pair of features that should not be enabled together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub first: String,
    pub second: String,
    pub severity: Severity,
    pub reason: String,
}

impl Conflict {
    pub fn new(
        first: impl Into<String>,
        second: impl Into<String>,
        severity: Severity,
        reason: impl Into<String>,
    ) -> Self {
        Self { first: first.into(), second: second.into(), severity, reason: reason.into() }
    }
}

/// Known mutually exclusive pairs of the built-in catalog.
#[must_use]
pub fn builtin_conflicts() -> Vec<Conflict> {
    vec![
        Conflict::new(
            CLASSIC_LAYOUT,
            ENHANCED_NAVIGATION,
            Severity::Error,
            "the classic layout replaces the navigation the enhanced version extends",
        ),
        Conflict::new(
            CLASSIC_LAYOUT,
            PERSONALIZED_DASHBOARD,
            Severity::Warning,
            "personalized widgets are hidden by the classic layout",
        ),
        Conflict::new(
            PERFORMANCE_MODE,
            ADVANCED_ANALYTICS,
            Severity::Warning,
            "analytics collection defeats the purpose of performance mode",
        ),
        Conflict::new(
            MOBILE_OPTIMIZATION,
            KEYBOARD_SHORTCUTS,
            Severity::Info,
            "keyboard shortcuts are rarely reachable on touch devices",
        ),
    ]
}

#[fstone_derive::validation_rule(
    id = "feature-conflict",
    category = "conflict",
    severity = "warning",
    description = "Mutually exclusive features are not enabled together"
)]
#[derive(Debug)]
pub struct FeatureConflictRule {
    conflicts: Vec<Conflict>,
}

impl FeatureConflictRule {
    #[must_use]
    pub const fn new(conflicts: Vec<Conflict>) -> Self {
        Self { conflicts }
    }
}

impl Default for FeatureConflictRule {
    fn default() -> Self {
        Self::new(builtin_conflicts())
    }
}

impl ValidationRule for FeatureConflictRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        Ok(self
            .conflicts
            .iter()
            .filter(|c| snapshot.is_enabled(&c.first) && snapshot.is_enabled(&c.second))
            .map(|c| {
                self.issue_at(c.severity, format!("{} conflicts with {}: {}", c.first, c.second, c.reason))
                    .with_features([c.first.as_str(), c.second.as_str()])
                    .with_suggestion(format!("Disable {} or {}", c.first, c.second))
            })
            .collect())
    }
}
