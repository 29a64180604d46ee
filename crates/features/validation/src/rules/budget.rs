use crate::error::ValidationError;
use crate::rule::{RuleMetadata, ValidationRule};
use fstone_domain::config::ValidationSettings;
use fstone_domain::{ImpactLevel, Severity, SystemSnapshot, ValidationIssue};

/// Sums the cpu/memory/network weights of enabled features against fixed budgets.
#[fstone_derive::validation_rule(
    id = "performance-impact",
    category = "performance",
    severity = "warning",
    description = "Enabled features stay within the cpu, memory and network budgets"
)]
#[derive(Debug)]
pub struct PerformanceImpactRule {
    cpu: u32,
    memory: u32,
    network: u32,
}

impl PerformanceImpactRule {
    #[must_use]
    pub const fn new(settings: &ValidationSettings) -> Self {
        Self {
            cpu: settings.cpu_threshold,
            memory: settings.memory_threshold,
            network: settings.network_threshold,
        }
    }
}

impl Default for PerformanceImpactRule {
    fn default() -> Self {
        Self::new(&ValidationSettings::default())
    }
}

impl ValidationRule for PerformanceImpactRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        let (mut cpu, mut memory, mut network) = (0, 0, 0);
        for feature in snapshot.enabled_features() {
            let impact = feature.performance_impact;
            cpu += impact.cpu.weight();
            memory += impact.memory.weight();
            network += impact.network.weight();
        }

        let issues = [("cpu", cpu, self.cpu), ("memory", memory, self.memory), ("network", network, self.network)]
            .into_iter()
            .filter(|(_, total, budget)| total > budget)
            .map(|(dimension, total, budget)| {
                self.issue(format!("Enabled features use {total} {dimension} points, over the budget of {budget}"))
                    .with_features(heaviest(snapshot, dimension))
                    .with_suggestion(format!("Disable one of the {dimension}-heavy features"))
            })
            .collect();
        Ok(issues)
    }
}

/// Enabled features with a high cost in `dimension`.
fn heaviest(snapshot: &SystemSnapshot, dimension: &str) -> Vec<String> {
    snapshot
        .enabled_features()
        .filter(|f| {
            let impact = f.performance_impact;
            let level = match dimension {
                "cpu" => impact.cpu,
                "memory" => impact.memory,
                _ => impact.network,
            };
            level == ImpactLevel::High
        })
        .map(|f| f.id.clone())
        .collect()
}

/// Advisory view of the overall footprint: the number of enabled features and memory hogs.
#[fstone_derive::validation_rule(
    id = "resource-usage",
    category = "resources",
    severity = "info",
    description = "Advisory summary of the resources enabled features consume"
)]
#[derive(Debug)]
pub struct ResourceUsageRule {
    max_enabled: usize,
}

impl ResourceUsageRule {
    #[must_use]
    pub const fn new(settings: &ValidationSettings) -> Self {
        Self { max_enabled: settings.max_enabled_features }
    }
}

impl Default for ResourceUsageRule {
    fn default() -> Self {
        Self::new(&ValidationSettings::default())
    }
}

impl ValidationRule for ResourceUsageRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        let mut issues = Vec::new();
        let enabled: Vec<&str> = snapshot.enabled_features().map(|f| f.id.as_str()).collect();
        if enabled.len() > self.max_enabled {
            issues.push(
                self.issue_at(
                    Severity::Warning,
                    format!("{} features are enabled, more than the recommended {}", enabled.len(), self.max_enabled),
                )
                .with_features(enabled.iter().copied()),
            );
        }

        let hogs = heaviest(snapshot, "memory");
        if hogs.len() > 1 {
            issues.push(
                self.issue(format!("{} memory-intensive features are enabled together", hogs.len()))
                    .with_features(hogs)
                    .with_suggestion("Consider enabling performance_mode on constrained devices"),
            );
        }
        Ok(issues)
    }
}
