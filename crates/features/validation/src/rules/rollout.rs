use crate::error::ValidationError;
use crate::rule::{RuleMetadata, ValidationRule};
use fstone_domain::{RolloutStrategy, SystemSnapshot, ValidationIssue};

#[fstone_derive::validation_rule(
    id = "rollout-strategy",
    category = "rollout",
    severity = "warning",
    description = "Rollout strategies carry the parameters they need"
)]
#[derive(Debug, Default)]
pub struct RolloutStrategyRule;

impl ValidationRule for RolloutStrategyRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        let mut issues = Vec::new();
        for feature in &snapshot.features {
            let problem = match &feature.rollout_strategy {
                RolloutStrategy::Gradual { percentage: None } => {
                    Some("uses a gradual rollout without a percentage; nobody will see it".to_owned())
                },
                RolloutStrategy::Gradual { percentage: Some(p) } if !(0.0..=100.0).contains(p) => {
                    Some(format!("has a rollout percentage of {p}, outside 0..=100"))
                },
                RolloutStrategy::Beta { user_groups } if user_groups.is_empty() => {
                    Some("uses a beta rollout without user groups".to_owned())
                },
                _ => None,
            };
            if let Some(problem) = problem {
                issues.push(
                    self.issue(format!("{} {problem}", feature.id))
                        .with_features([feature.id.as_str()])
                        .with_suggestion("Complete the rollout strategy or switch to an immediate rollout"),
                );
            }
        }
        Ok(issues)
    }
}
