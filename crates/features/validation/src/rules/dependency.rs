use crate::error::ValidationError;
use crate::rule::{RuleMetadata, ValidationRule};
use fstone_domain::{Severity, SystemSnapshot, ValidationIssue};
use fxhash::FxHashMap;

#[fstone_derive::validation_rule(
    id = "dependency-chain",
    category = "dependency",
    severity = "error",
    description = "Every dependency of an enabled feature is enabled"
)]
#[derive(Debug, Default)]
pub struct DependencyChainRule;

impl ValidationRule for DependencyChainRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        let mut issues = Vec::new();
        for feature in snapshot.enabled_features() {
            for dependency in &feature.dependencies {
                if snapshot.feature(dependency).is_some() && !snapshot.is_enabled(dependency) {
                    issues.push(
                        self.issue(format!("{} is enabled but its dependency {dependency} is not", feature.id))
                            .with_features([feature.id.as_str(), dependency.as_str()])
                            .with_suggestion(format!("Enable {dependency} or disable {}", feature.id)),
                    );
                }
            }
        }
        Ok(issues)
    }
}

/// Dependencies on ids that are not registered: an error for enabled features, a warning otherwise.
#[fstone_derive::validation_rule(
    id = "missing-dependency",
    category = "dependency",
    severity = "error",
    description = "Every declared dependency is a registered feature"
)]
#[derive(Debug, Default)]
pub struct MissingDependencyRule;

impl ValidationRule for MissingDependencyRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        let mut issues = Vec::new();
        for feature in &snapshot.features {
            let severity = if snapshot.is_enabled(&feature.id) { Severity::Error } else { Severity::Warning };
            for dependency in feature.dependencies.iter().filter(|d| snapshot.feature(d).is_none()) {
                issues.push(
                    self.issue_at(severity, format!("{} depends on unknown feature {dependency}", feature.id))
                        .with_features([feature.id.as_str(), dependency.as_str()])
                        .with_suggestion(format!("Register {dependency} or drop the dependency")),
                );
            }
        }
        Ok(issues)
    }
}

#[fstone_derive::validation_rule(
    id = "circular-dependency",
    category = "dependency",
    severity = "error",
    description = "The dependency graph is acyclic"
)]
#[derive(Debug, Default)]
pub struct CircularDependencyRule;

impl ValidationRule for CircularDependencyRule {
    fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
        let cycles = find_cycles(snapshot);
        Ok(cycles
            .into_iter()
            .map(|cycle| {
                self.issue(format!("Circular dependency: {}", cycle.join(" → ")))
                    .with_features(cycle)
                    .with_suggestion("Remove one dependency edge of the cycle")
            })
            .collect())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Depth-first search with a recursion stack; every back edge yields the cycle path,
/// first node repeated at the end (`a → b → c → a`).
pub(crate) fn find_cycles(snapshot: &SystemSnapshot) -> Vec<Vec<String>> {
    fn visit<'a>(
        snapshot: &'a SystemSnapshot,
        id: &'a str,
        marks: &mut FxHashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        let Some(feature) = snapshot.feature(id) else {
            return;
        };
        marks.insert(id, Mark::Visiting);
        stack.push(id);

        for dependency in &feature.dependencies {
            match marks.get(dependency.as_str()) {
                Some(Mark::Visiting) => {
                    if let Some(start) = stack.iter().position(|s| *s == dependency) {
                        let mut cycle: Vec<String> = stack[start..].iter().map(|s| (*s).to_owned()).collect();
                        cycle.push(dependency.clone());
                        cycles.push(cycle);
                    }
                },
                Some(Mark::Done) => {},
                None => visit(snapshot, dependency, marks, stack, cycles),
            }
        }

        stack.pop();
        marks.insert(id, Mark::Done);
    }

    let mut marks = FxHashMap::default();
    let mut stack = Vec::new();
    let mut cycles = Vec::new();
    for feature in &snapshot.features {
        if !marks.contains_key(feature.id.as_str()) {
            visit(snapshot, &feature.id, &mut marks, &mut stack, &mut cycles);
        }
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use fstone_domain::Feature;

    fn snapshot(features: Vec<Feature>) -> SystemSnapshot {
        SystemSnapshot::new(features)
    }

    #[test]
    fn chain_reports_disabled_dependency_of_enabled_feature() {
        let snap = snapshot(vec![
            Feature::new("a", "A"),
            Feature::new("b", "B").depends_on("a").enabled(true),
            Feature::new("c", "C").depends_on("a"),
        ]);
        let issues = DependencyChainRule.validate(&snap).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].features, vec!["b", "a"]);
        assert_eq!(issues[0].rule, DependencyChainRule::ID);
    }

    #[test]
    fn missing_dependency_severity_follows_enablement() {
        let snap = snapshot(vec![
            Feature::new("a", "A").depends_on("ghost").enabled(true),
            Feature::new("b", "B").depends_on("ghost"),
        ]);
        let issues = MissingDependencyRule.validate(&snap).unwrap();
        let severities: Vec<_> = issues.iter().map(|i| i.severity).collect();
        assert_eq!(severities, vec![Severity::Error, Severity::Warning]);
    }

    #[test]
    fn cycle_path_is_reported_in_order() {
        let snap = snapshot(vec![
            Feature::new("a", "A").depends_on("b"),
            Feature::new("b", "B").depends_on("c"),
            Feature::new("c", "C").depends_on("a"),
            Feature::new("d", "D").depends_on("a"),
        ]);
        let issues = CircularDependencyRule.validate(&snap).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].features, vec!["a", "b", "c", "a"]);
        assert!(issues[0].message.contains("a → b → c → a"));
    }

    #[test]
    fn self_dependency_is_a_cycle_and_dags_are_clean() {
        let looped = snapshot(vec![Feature::new("a", "A").depends_on("a")]);
        assert_eq!(find_cycles(&looped), vec![vec!["a".to_owned(), "a".to_owned()]]);

        let diamond = snapshot(vec![
            Feature::new("top", "Top").depends_on("l").depends_on("r"),
            Feature::new("l", "L").depends_on("base"),
            Feature::new("r", "R").depends_on("base"),
            Feature::new("base", "Base"),
        ]);
        assert!(find_cycles(&diamond).is_empty());
    }
}
