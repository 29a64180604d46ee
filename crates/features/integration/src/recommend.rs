use fstone_domain::constants::{
    ACCESSIBILITY, ADVANCED_SEARCH, BETA_TESTERS, DARK_MODE, ENHANCED_NAVIGATION, KEYBOARD_SHORTCUTS,
    MOBILE_OPTIMIZATION, OFFLINE_MODE, PERFORMANCE_MODE, PERSONALIZED_DASHBOARD, SMART_NOTIFICATIONS,
};
use fstone_domain::{AttributeValue, Environment, EvaluationContext, Feature};
use serde::Serialize;

/// `(enabled feature, complementary feature)` pairs.
const COMPLEMENTS: &[(&str, &str)] = &[
    (ENHANCED_NAVIGATION, KEYBOARD_SHORTCUTS),
    (ENHANCED_NAVIGATION, ADVANCED_SEARCH),
    (ADVANCED_SEARCH, PERSONALIZED_DASHBOARD),
    (PERSONALIZED_DASHBOARD, SMART_NOTIFICATIONS),
    (DARK_MODE, ACCESSIBILITY),
    (OFFLINE_MODE, PERFORMANCE_MODE),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub feature: String,
    pub reason: String,
}

/// Disabled features worth offering to the user behind `ctx`.
///
/// A candidate must have every dependency enabled. Complements of enabled features come first
/// (in catalog order), then suggestions driven by the device, the user's attributes and
/// beta membership. Each feature appears once, with the first reason found.
pub(crate) fn recommend(
    features: &[Feature],
    is_enabled: impl Fn(&str) -> bool,
    ctx: &EvaluationContext,
    environment: Option<&Environment>,
) -> Vec<Recommendation> {
    let mut out: Vec<Recommendation> = Vec::new();
    let mut offer = |feature: &Feature, reason: String| {
        let ready = !is_enabled(&feature.id) && feature.dependencies.iter().all(|d| is_enabled(d.as_str()));
        if ready && !out.iter().any(|r| r.feature == feature.id) {
            out.push(Recommendation { feature: feature.id.clone(), reason });
        }
    };

    for feature in features {
        if let Some((anchor, _)) =
            COMPLEMENTS.iter().find(|(anchor, complement)| *complement == feature.id && is_enabled(*anchor))
        {
            offer(feature, format!("Works well with {anchor}"));
        }
    }

    let mobile = environment.is_some_and(Environment::is_mobile)
        || ctx.device_type.as_deref().is_some_and(|d| d.eq_ignore_ascii_case("mobile"));
    let beta_tester = ctx.user_attributes.groups.iter().any(|g| g == BETA_TESTERS);
    let wants_accessibility =
        matches!(ctx.user_attributes.values.get(ACCESSIBILITY), Some(AttributeValue::Bool(true)));

    for feature in features {
        if mobile && feature.id == MOBILE_OPTIMIZATION {
            offer(feature, "Optimized layout for mobile devices".to_owned());
        } else if wants_accessibility && feature.id == ACCESSIBILITY {
            offer(feature, "Matches the user's accessibility preferences".to_owned());
        } else if beta_tester && feature.beta {
            offer(feature, "Available to beta testers".to_owned());
        }
    }
    out
}
