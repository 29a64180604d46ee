use fstone_validation::{
    RuleCategory, RuleMetadata, Severity, SystemSnapshot, ValidationError, ValidationIssue,
    ValidationRule,
};

#[fstone_derive::validation_rule(
    id = "max-features",
    category = "resources",
    severity = "warning",
    description = "Caps the number of registered features"
)]
struct MaxFeaturesRule {
    limit: usize,
}

impl ValidationRule for MaxFeaturesRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        if snapshot.features.len() > self.limit {
            return Ok(vec![self.issue("too many features")]);
        }
        Ok(Vec::new())
    }
}

fn main() {
    let rule = MaxFeaturesRule { limit: 0 };
    assert_eq!(MaxFeaturesRule::ID, "max-features");
    assert_eq!(rule.category(), RuleCategory::Resources);
    assert_eq!(rule.severity(), Severity::Warning);
    assert_eq!(rule.description(), "Caps the number of registered features");
    assert!(format!("{rule:?}").contains("MaxFeaturesRule"));
    assert!(rule.validate(&SystemSnapshot::default()).unwrap().is_empty());
}
