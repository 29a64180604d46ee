use fstone_domain::MigrationState;
use fstone_validation::ValidationReport;
use serde::Serialize;
use std::collections::BTreeMap;

/// Aggregate view returned by [`crate::Coordinator::health_status`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// A feature whose registry switch and committed flag disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Drift {
    pub feature: String,
    pub registry: bool,
    pub flag: bool,
}

pub(crate) fn assess(
    report: &ValidationReport,
    drift: &[Drift],
    migrations: &BTreeMap<String, MigrationState>,
) -> HealthStatus {
    let mut status = HealthStatus {
        issues: report.issues.iter().map(|i| format!("[{}] {}", i.rule, i.message)).collect(),
        warnings: report.warnings.iter().map(|i| format!("[{}] {}", i.rule, i.message)).collect(),
        recommendations: report.recommendations(),
        ..HealthStatus::default()
    };

    for d in drift {
        status.issues.push(format!(
            "{} is {} in the registry but its flag is {}",
            d.feature,
            on_off(d.registry),
            on_off(d.flag)
        ));
    }
    if !drift.is_empty() {
        push_unique(&mut status.recommendations, "Reload persisted state to resynchronize feature flags");
    }

    for (feature, state) in migrations {
        if *state == MigrationState::Failed {
            status.warnings.push(format!("Migrations of {feature} failed"));
            push_unique(
                &mut status.recommendations,
                &format!("Retry or roll back the migrations of {feature}"),
            );
        }
    }

    status.healthy = status.issues.is_empty();
    status
}

const fn on_off(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

fn push_unique(list: &mut Vec<String>, text: &str) {
    if !list.iter().any(|s| s == text) {
        list.push(text.to_owned());
    }
}
