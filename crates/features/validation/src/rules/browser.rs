use crate::error::ValidationError;
use crate::rule::{RuleMetadata, ValidationRule};
use fstone_domain::constants::components;
use fstone_domain::version::satisfies;
use fstone_domain::{Capabilities, Severity, SystemSnapshot, ValidationIssue};

/// Advisory check of enabled features against the reported host environment.
///
/// Browser version ranges that the host misses are warnings; missing capabilities are
/// informational since the compatibility checker already gated the enable. Without an
/// environment in the snapshot the rule reports nothing.
#[fstone_derive::validation_rule(
    id = "browser-support",
    category = "browser",
    severity = "info",
    description = "Enabled features are supported by the current browser"
)]
#[derive(Debug, Default)]
pub struct BrowserSupportRule;

impl ValidationRule for BrowserSupportRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        let Some(env) = &snapshot.environment else {
            return Ok(Vec::new());
        };

        let mut issues = Vec::new();
        for feature in snapshot.enabled_features() {
            for requirement in &feature.compatibility_requirements {
                if requirement.component == components::BROWSER {
                    let version = &env.browser.version;
                    if !version.is_empty()
                        && !satisfies(version, &requirement.min_version, requirement.max_version.as_deref())
                    {
                        issues.push(
                            self.issue_at(
                                Severity::Warning,
                                format!(
                                    "{} expects browser {}+ but {} {version} is reported",
                                    feature.id, requirement.min_version, env.browser.name
                                ),
                            )
                            .with_features([feature.id.as_str()])
                            .with_suggestion("Ask affected users to update their browser"),
                        );
                    }
                } else if let Some(capability) = Capabilities::from_component(&requirement.component)
                    && !env.supports(capability)
                {
                    issues.push(
                        self.issue(format!("{} uses {} which the host does not report", feature.id, requirement.component))
                            .with_features([feature.id.as_str()]),
                    );
                }
            }
        }
        Ok(issues)
    }
}
