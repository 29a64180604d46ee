use crate::error::ValidationError;
use crate::rule::{RuleMetadata, ValidationRule};
use fstone_domain::version::satisfies;
use fstone_domain::{Severity, SystemSnapshot, ValidationIssue};

/// Checks version constraints a feature places on other features.
///
/// A compatibility requirement whose component is a registered feature id is checked against
/// that feature's version. Host components (browser, storage, …) belong to the compatibility
/// checker and are skipped here. Violations are errors when the constrained feature is enabled.
#[fstone_derive::validation_rule(
    id = "version-compatibility",
    category = "version",
    severity = "error",
    description = "Features meet the version ranges their dependents require"
)]
#[derive(Debug, Default)]
pub struct VersionCompatibilityRule;

impl ValidationRule for VersionCompatibilityRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        let mut issues = Vec::new();
        for feature in &snapshot.features {
            for requirement in &feature.compatibility_requirements {
                let Some(target) = snapshot.feature(&requirement.component) else {
                    continue;
                };
                if satisfies(&target.version, &requirement.min_version, requirement.max_version.as_deref()) {
                    continue;
                }

                let range = match &requirement.max_version {
                    Some(max) => format!("{}..={max}", requirement.min_version),
                    None => format!(">={}", requirement.min_version),
                };
                let severity = if snapshot.is_enabled(&feature.id) { self.severity() } else { Severity::Warning };
                issues.push(
                    self.issue_at(
                        severity,
                        format!("{} requires {} {range}, found {}", feature.id, target.id, target.version),
                    )
                    .with_features([feature.id.as_str(), target.id.as_str()])
                    .with_suggestion(format!("Upgrade {} to a version in {range}", target.id)),
                );
            }
        }
        Ok(issues)
    }
}
