//! The built-in UX feature catalog.

use fstone_domain::constants::{self, BETA_TESTERS, components};
use fstone_domain::{CompatibilityRequirement, Feature, ImpactLevel, RolloutStrategy};

/// Every feature the platform ships with, in registration order. All start disabled.
#[must_use]
pub fn builtin_features() -> Vec<Feature> {
    use ImpactLevel::{High, Low, Medium};

    vec![
        Feature::new(constants::ENHANCED_NAVIGATION, "Enhanced navigation")
            .describe("Breadcrumbs, quick-jump menu and contextual navigation shortcuts")
            .version("2.1.0")
            .requires(CompatibilityRequirement::required(components::BROWSER, "90"))
            .impact(Low, Low, Low),
        Feature::new(constants::DARK_MODE, "Dark mode")
            .describe("Dark colour scheme that follows the user's preference")
            .version("1.2.0")
            .requires(CompatibilityRequirement::optional(components::LOCAL_STORAGE, "1"))
            .impact(Low, Low, Low),
        Feature::new(constants::PERSONALIZED_DASHBOARD, "Personalized dashboard")
            .describe("Drag-and-drop widgets and a per-user dashboard layout")
            .version("2.0.0")
            .depends_on(constants::ENHANCED_NAVIGATION)
            .requires(CompatibilityRequirement::required(components::LOCAL_STORAGE, "1"))
            .impact(Medium, Medium, Low),
        Feature::new(constants::ACCESSIBILITY, "Accessibility enhancements")
            .describe("Scalable fonts, high-contrast theme and screen reader hints")
            .version("1.1.0")
            .impact(Low, Low, Low),
        Feature::new(constants::ADVANCED_SEARCH, "Advanced search")
            .describe("Faceted search with filters and saved queries")
            .version("1.0.0")
            .depends_on(constants::ENHANCED_NAVIGATION)
            .requires(CompatibilityRequirement::optional(components::WEB_WORKERS, "1"))
            .rollout(RolloutStrategy::gradual(50.0))
            .impact(Medium, Medium, Medium),
        Feature::new(constants::SMART_NOTIFICATIONS, "Smart notifications")
            .describe("Batched, priority-aware notifications")
            .version("0.9.0")
            .requires(CompatibilityRequirement::required(components::NOTIFICATIONS, "1"))
            .requires(CompatibilityRequirement::required(components::SERVICE_WORKER, "1"))
            .rollout(RolloutStrategy::beta([BETA_TESTERS]))
            .beta()
            .impact(Low, Low, Medium),
        Feature::new(constants::OFFLINE_MODE, "Offline mode")
            .describe("Caches recently used views for offline use")
            .version("1.0.0")
            .requires(CompatibilityRequirement::required(components::SERVICE_WORKER, "1"))
            .requires(CompatibilityRequirement::required(components::INDEXED_DB, "1"))
            .impact(Medium, High, Low),
        Feature::new(constants::MOBILE_OPTIMIZATION, "Mobile optimization")
            .describe("Touch-friendly controls and a compact layout for small screens")
            .version("1.3.0")
            .requires(CompatibilityRequirement::optional(components::TOUCH, "1"))
            .impact(Low, Low, Low),
        Feature::new(constants::ADVANCED_ANALYTICS, "Advanced analytics")
            .describe("Client-side usage analytics and interactive charts")
            .version("1.0.0")
            .requires(CompatibilityRequirement::optional(components::WEBGL, "1"))
            .rollout(RolloutStrategy::Manual)
            .impact(High, Medium, High),
        Feature::new(constants::PERFORMANCE_MODE, "Performance mode")
            .describe("Reduced animations and lazy widget loading")
            .version("1.0.0")
            .impact(Low, Low, Low),
        Feature::new(constants::CLASSIC_LAYOUT, "Classic layout")
            .describe("The legacy page layout and navigation")
            .version("1.0.0")
            .impact(Low, Low, Low),
        Feature::new(constants::KEYBOARD_SHORTCUTS, "Keyboard shortcuts")
            .describe("Global keyboard shortcuts and a command palette")
            .version("1.0.0")
            .impact(Low, Low, Low),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxhash::FxHashSet;

    #[test]
    fn catalog_ids_are_unique_and_disabled() {
        let features = builtin_features();
        let ids: FxHashSet<_> = features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids.len(), features.len());
        assert!(features.iter().all(|f| !f.enabled));
    }

    #[test]
    fn catalog_dependencies_resolve() {
        let features = builtin_features();
        for feature in &features {
            for dependency in &feature.dependencies {
                assert!(
                    features.iter().any(|f| &f.id == dependency),
                    "{} depends on unknown {dependency}",
                    feature.id
                );
            }
        }
    }
}
