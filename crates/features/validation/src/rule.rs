use crate::error::ValidationError;
use fstone_domain::{RuleCategory, Severity, SystemSnapshot, ValidationIssue};
use std::fmt::Debug;

/// Static description of a rule, usually generated by `#[fstone_derive::validation_rule]`.
pub trait RuleMetadata {
    fn id(&self) -> &'static str;

    fn category(&self) -> RuleCategory;

    /// Severity of the issues the rule reports unless it says otherwise.
    fn severity(&self) -> Severity;

    fn description(&self) -> &'static str;

    /// An issue of this rule at its default severity.
    fn issue(&self, message: impl Into<String>) -> ValidationIssue
    where
        Self: Sized,
    {
        ValidationIssue::new(self.id(), self.category(), self.severity(), message)
    }

    fn issue_at(&self, severity: Severity, message: impl Into<String>) -> ValidationIssue
    where
        Self: Sized,
    {
        ValidationIssue::new(self.id(), self.category(), severity, message)
    }
}

/// A self-contained check over the whole system.
///
/// Rules are independent of each other and must not panic; anything they cannot judge is
/// reported as `Err`, which the engine turns into an error issue of the rule.
pub trait ValidationRule: RuleMetadata + Debug + Send + Sync {
    /// # Errors
    /// Returns [`ValidationError::RuleFailed`] if the snapshot cannot be evaluated.
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError>;
}
