use crate::rule::ValidationRule;
use crate::rules::builtin_rules;
use fstone_domain::config::ValidationSettings;
use fstone_domain::{Severity, SystemSnapshot, ValidationIssue};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub rules_run: usize,
    pub rules_passed: usize,
    /// Rules that reported at least one error, failed rules included.
    pub rules_failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

/// Result of one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// No error-severity issue was reported.
    pub valid: bool,
    /// Error-severity issues.
    pub issues: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    /// Informational findings.
    pub suggestions: Vec<ValidationIssue>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    /// Issues of `rule`, any severity.
    pub fn by_rule<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues
            .iter()
            .chain(&self.warnings)
            .chain(&self.suggestions)
            .filter(move |issue| issue.rule == rule)
    }

    /// Every distinct suggestion text attached to an issue, in report order.
    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for text in self.issues.iter().chain(&self.warnings).chain(&self.suggestions).filter_map(|i| i.suggestion.as_ref()) {
            if !out.contains(text) {
                out.push(text.clone());
            }
        }
        out
    }

    fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => {
                self.summary.errors += 1;
                self.issues.push(issue);
            },
            Severity::Warning => {
                self.summary.warnings += 1;
                self.warnings.push(issue);
            },
            Severity::Info => {
                self.summary.infos += 1;
                self.suggestions.push(issue);
            },
        }
    }
}

/// Runs a mutable battery of [`ValidationRule`]s over a [`SystemSnapshot`].
///
/// Clones share the rule list. Rules run in registration order and independently: a rule
/// returning `Err` contributes one error issue tagged with its id and the pass goes on.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    rules: Arc<RwLock<Vec<Arc<dyn ValidationRule>>>>,
}

impl ValidationEngine {
    /// An engine loaded with the ten built-in rules.
    #[must_use]
    pub fn new(settings: &ValidationSettings) -> Self {
        let engine = Self::empty();
        for rule in builtin_rules(settings) {
            engine.add_rule(rule);
        }
        engine
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds a rule; a rule with the same id is replaced in place.
    pub fn add_rule(&self, rule: Arc<dyn ValidationRule>) {
        let mut rules = self.rules.write();
        match rules.iter().position(|r| r.id() == rule.id()) {
            Some(slot) => {
                warn!(rule = rule.id(), "Validation rule replaced");
                rules[slot] = rule;
            },
            None => {
                debug!(rule = rule.id(), category = %rule.category(), "Validation rule added");
                rules.push(rule);
            },
        }
    }

    /// Removes a rule by id; returns whether it was registered.
    pub fn remove_rule(&self, id: &str) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id() != id);
        before != rules.len()
    }

    #[must_use]
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.read().iter().map(|r| r.id()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    #[must_use]
    pub fn validate(&self, snapshot: &SystemSnapshot) -> ValidationReport {
        let rules = self.rules.read().clone();
        let mut report = ValidationReport::default();

        for rule in &rules {
            report.summary.rules_run += 1;
            let issues = match rule.validate(snapshot) {
                Ok(issues) => issues,
                Err(err) => {
                    warn!(rule = rule.id(), error = %err, "Validation rule failed");
                    vec![ValidationIssue::new(rule.id(), rule.category(), Severity::Error, err.to_string())]
                },
            };

            if issues.iter().any(ValidationIssue::is_error) {
                report.summary.rules_failed += 1;
            } else {
                report.summary.rules_passed += 1;
            }
            for issue in issues {
                report.push(issue);
            }
        }

        report.valid = report.issues.is_empty();
        debug!(
            rules = report.summary.rules_run,
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            "Validation pass finished"
        );
        report
    }
}
