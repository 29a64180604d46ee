//! The built-in rule battery.

mod browser;
mod budget;
mod conflict;
mod dependency;
mod migration;
mod rollout;
mod version;

pub use browser::BrowserSupportRule;
pub use budget::{PerformanceImpactRule, ResourceUsageRule};
pub use conflict::{Conflict, FeatureConflictRule, builtin_conflicts};
pub use dependency::{CircularDependencyRule, DependencyChainRule, MissingDependencyRule};
pub use migration::MigrationCompletionRule;
pub use rollout::RolloutStrategyRule;
pub use version::VersionCompatibilityRule;

use crate::rule::ValidationRule;
use fstone_domain::config::ValidationSettings;
use std::sync::Arc;

/// The ten built-in rules in reporting order.
#[must_use]
pub fn builtin_rules(settings: &ValidationSettings) -> Vec<Arc<dyn ValidationRule>> {
    vec![
        Arc::new(DependencyChainRule),
        Arc::new(MissingDependencyRule),
        Arc::new(CircularDependencyRule),
        Arc::new(VersionCompatibilityRule),
        Arc::new(PerformanceImpactRule::new(settings)),
        Arc::new(FeatureConflictRule::default()),
        Arc::new(RolloutStrategyRule),
        Arc::new(MigrationCompletionRule),
        Arc::new(BrowserSupportRule),
        Arc::new(ResourceUsageRule::new(settings)),
    ]
}
