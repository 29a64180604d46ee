use crate::check::{CheckOutcome, CompatibilityCheck, builtin_checks};
use fstone_domain::config::{CompatibilityMode, CompatibilitySettings};
use fstone_domain::{Environment, Feature, Severity};
use fxhash::{FxHashMap, FxHasher};
use moka::sync::Cache;
use parking_lot::RwLock;
use serde::Serialize;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A failed check on a required component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityIssue {
    pub component: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub feature: String,
    pub version: String,
    pub mode: CompatibilityMode,
    pub compatible: bool,
    pub issues: Vec<CompatibilityIssue>,
    /// Failures of optional requirements; never affect `compatible`.
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    /// Components patched by a remediation (auto mode only).
    pub remediated: Vec<String>,
}

#[derive(Debug)]
struct CachedReport {
    environment: u64,
    report: CompatibilityReport,
}

/// Runs the compatibility checks a feature's requirements name.
///
/// * **strict**: any failed required check makes the feature incompatible;
/// * **lenient**: only error-severity failures do;
/// * **auto**: failed checks with a remediation are remediated on a copy of the environment,
///   then all checks run once more and are judged leniently.
///
/// Reports are cached per `(feature id, version)` and reused while the environment is
/// unchanged. Clones share checks and cache.
#[derive(Debug, Clone)]
pub struct CompatibilityChecker {
    mode: CompatibilityMode,
    checks: Arc<RwLock<FxHashMap<String, Arc<dyn CompatibilityCheck>>>>,
    cache: Cache<(String, String), Arc<CachedReport>>,
}

impl CompatibilityChecker {
    /// A checker with every built-in check registered.
    #[must_use]
    pub fn new(settings: &CompatibilitySettings) -> Self {
        let checker = Self {
            mode: settings.mode,
            checks: Arc::default(),
            cache: Cache::new(settings.cache_capacity),
        };
        for check in builtin_checks() {
            checker.register_check(Arc::from(check));
        }
        checker
    }

    #[must_use]
    pub const fn mode(&self) -> CompatibilityMode {
        self.mode
    }

    /// Adds or replaces the check for its component and clears cached reports.
    pub fn register_check(&self, check: Arc<dyn CompatibilityCheck>) {
        let component = check.component().to_owned();
        if self.checks.write().insert(component.clone(), check).is_some() {
            debug!(component = %component, "Compatibility check replaced");
        }
        self.cache.invalidate_all();
    }

    #[must_use]
    pub fn components(&self) -> Vec<String> {
        let mut components: Vec<_> = self.checks.read().keys().cloned().collect();
        components.sort();
        components
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Validates `feature` against `environment`.
    #[must_use]
    pub fn validate(&self, feature: &Feature, environment: &Environment) -> CompatibilityReport {
        let key = (feature.id.clone(), feature.version.clone());
        let fingerprint = environment_fingerprint(environment);

        if let Some(cached) = self.cache.get(&key)
            && cached.environment == fingerprint
        {
            debug!(feature = %feature.id, "Compatibility cache hit");
            return cached.report.clone();
        }

        let report = self.run(feature, environment);
        if !report.compatible {
            warn!(
                feature = %feature.id,
                mode = %self.mode,
                issues = report.issues.len(),
                "Feature is incompatible with the environment"
            );
        }
        self.cache.insert(key, Arc::new(CachedReport { environment: fingerprint, report: report.clone() }));
        report
    }

    fn run(&self, feature: &Feature, environment: &Environment) -> CompatibilityReport {
        let checks = self.checks.read();
        let mut findings = evaluate(&checks, feature, environment);
        let mut remediated = Vec::new();

        if self.mode == CompatibilityMode::Auto && !findings.failed.is_empty() {
            let mut patched = environment.clone();
            for component in &findings.failed {
                if let Some(check) = checks.get(component)
                    && check.remediate(&mut patched)
                {
                    info!(feature = %feature.id, component = %component, "Remediation applied");
                    remediated.push(component.clone());
                }
            }
            if !remediated.is_empty() {
                findings = evaluate(&checks, feature, &patched);
            }
        }

        let compatible = match self.mode {
            CompatibilityMode::Strict => findings.issues.is_empty(),
            CompatibilityMode::Lenient | CompatibilityMode::Auto => {
                !findings.issues.iter().any(|i| i.severity == Severity::Error)
            },
        };

        CompatibilityReport {
            feature: feature.id.clone(),
            version: feature.version.clone(),
            mode: self.mode,
            compatible,
            issues: findings.issues,
            warnings: findings.warnings,
            suggestions: findings.suggestions,
            remediated,
        }
    }
}

#[derive(Default)]
struct Findings {
    issues: Vec<CompatibilityIssue>,
    warnings: Vec<String>,
    suggestions: Vec<String>,
    /// Components whose check failed, in requirement order.
    failed: Vec<String>,
}

fn evaluate(
    checks: &FxHashMap<String, Arc<dyn CompatibilityCheck>>,
    feature: &Feature,
    environment: &Environment,
) -> Findings {
    let mut findings = Findings::default();

    for requirement in &feature.compatibility_requirements {
        let outcome = match checks.get(&requirement.component) {
            Some(check) => check.check(requirement, environment),
            None => CheckOutcome::error(format!("no check for component {}", requirement.component)),
        };

        let CheckOutcome::Fail { severity, message, suggestion } = outcome else {
            continue;
        };

        findings.failed.push(requirement.component.clone());
        findings.suggestions.extend(suggestion);
        if requirement.required {
            findings.issues.push(CompatibilityIssue {
                component: requirement.component.clone(),
                severity,
                message,
            });
        } else {
            findings.warnings.push(message);
        }
    }
    findings
}

fn environment_fingerprint(environment: &Environment) -> u64 {
    let mut hasher = FxHasher::default();
    environment.browser.name.hash(&mut hasher);
    environment.browser.version.hash(&mut hasher);
    environment.platform.hash(&mut hasher);
    environment.device_type.hash(&mut hasher);
    environment.supported_features.bits().hash(&mut hasher);
    hasher.finish()
}
