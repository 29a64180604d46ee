//! Per-component checks and their paired remediations.

use fstone_domain::constants::components;
use fstone_domain::version::{compare_versions, satisfies};
use fstone_domain::{Capabilities, CompatibilityRequirement, Environment, Severity};
use std::cmp::Ordering;
use std::fmt::Debug;

/// Result of one check against one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Pass,
    Fail { severity: Severity, message: String, suggestion: Option<String> },
}

impl CheckOutcome {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Fail { severity: Severity::Error, message: message.into(), suggestion: None }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::Fail { severity: Severity::Warning, message: message.into(), suggestion: None }
    }

    #[must_use]
    pub fn suggest(self, hint: impl Into<String>) -> Self {
        match self {
            Self::Fail { severity, message, .. } => {
                Self::Fail { severity, message, suggestion: Some(hint.into()) }
            },
            Self::Pass => Self::Pass,
        }
    }

    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// A check for one host component (`browser`, `indexed_db`, …).
pub trait CompatibilityCheck: Debug + Send + Sync {
    /// The component name matched against [`CompatibilityRequirement::component`].
    fn component(&self) -> &str;

    fn check(&self, requirement: &CompatibilityRequirement, environment: &Environment) -> CheckOutcome;

    /// Attempts to make a failing check pass by patching `environment`.
    /// Returns whether anything changed. The default has no remediation.
    fn remediate(&self, _environment: &mut Environment) -> bool {
        false
    }
}

/// Name-agnostic browser version range.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserCheck;

impl CompatibilityCheck for BrowserCheck {
    fn component(&self) -> &str {
        components::BROWSER
    }

    fn check(&self, requirement: &CompatibilityRequirement, environment: &Environment) -> CheckOutcome {
        let version = environment.browser.version.trim();
        if version.is_empty() {
            return CheckOutcome::warning("browser version is unknown");
        }

        if compare_versions(version, &requirement.min_version) == Ordering::Less {
            return CheckOutcome::error(format!(
                "browser {} {version} is older than the required {}",
                environment.browser.name, requirement.min_version
            ))
            .suggest(format!("Upgrade the browser to version {} or newer", requirement.min_version));
        }

        match requirement.max_version.as_deref() {
            Some(max) if compare_versions(version, max) == Ordering::Greater => {
                CheckOutcome::warning(format!("browser version {version} is newer than the tested {max}"))
            },
            _ => CheckOutcome::Pass,
        }
    }
}

/// Platform version range; the platform string is `"<name> <version>"`, e.g. `"ios 17.2"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformCheck;

impl CompatibilityCheck for PlatformCheck {
    fn component(&self) -> &str {
        components::PLATFORM
    }

    fn check(&self, requirement: &CompatibilityRequirement, environment: &Environment) -> CheckOutcome {
        let platform = environment.platform.trim();
        if platform.is_empty() {
            return CheckOutcome::warning("platform is unknown");
        }

        let Some(version) = platform.split_whitespace().nth(1) else {
            return CheckOutcome::warning(format!("platform {platform} does not report a version"));
        };

        if satisfies(version, &requirement.min_version, requirement.max_version.as_deref()) {
            CheckOutcome::Pass
        } else {
            CheckOutcome::error(format!(
                "platform {platform} is outside {}..{}",
                requirement.min_version,
                requirement.max_version.as_deref().unwrap_or("")
            ))
        }
    }
}

/// Shims that can stand in for a missing capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polyfill {
    /// In-memory `localStorage`.
    LocalStorage,
    /// In-memory `sessionStorage`.
    SessionStorage,
    /// `IndexedDB` shim backed by `localStorage`; needs local storage.
    IndexedDbOverLocalStorage,
}

impl Polyfill {
    const fn provides(self) -> Capabilities {
        match self {
            Self::LocalStorage => Capabilities::LOCAL_STORAGE,
            Self::SessionStorage => Capabilities::SESSION_STORAGE,
            Self::IndexedDbOverLocalStorage => Capabilities::INDEXED_DB,
        }
    }

    fn applicable(self, environment: &Environment) -> bool {
        match self {
            Self::LocalStorage | Self::SessionStorage => true,
            Self::IndexedDbOverLocalStorage => environment.supports(Capabilities::LOCAL_STORAGE),
        }
    }
}

/// A boolean host capability, optionally with a polyfill.
#[derive(Debug, Clone)]
pub struct CapabilityCheck {
    component: &'static str,
    capability: Capabilities,
    polyfill: Option<Polyfill>,
}

impl CapabilityCheck {
    #[must_use]
    pub const fn new(component: &'static str, capability: Capabilities) -> Self {
        Self { component, capability, polyfill: None }
    }

    #[must_use]
    pub const fn with_polyfill(mut self, polyfill: Polyfill) -> Self {
        self.polyfill = Some(polyfill);
        self
    }
}

impl CompatibilityCheck for CapabilityCheck {
    fn component(&self) -> &str {
        self.component
    }

    fn check(&self, _requirement: &CompatibilityRequirement, environment: &Environment) -> CheckOutcome {
        if environment.supports(self.capability) {
            return CheckOutcome::Pass;
        }
        let outcome = CheckOutcome::error(format!("{} is not supported", self.component));
        match self.polyfill {
            Some(_) => outcome.suggest(format!("A polyfill for {} is available in auto mode", self.component)),
            None => outcome,
        }
    }

    fn remediate(&self, environment: &mut Environment) -> bool {
        match self.polyfill {
            Some(polyfill) if polyfill.applicable(environment) && !environment.supports(polyfill.provides()) => {
                environment.supported_features.insert(polyfill.provides());
                true
            },
            _ => false,
        }
    }
}

/// Every built-in check.
#[must_use]
pub fn builtin_checks() -> Vec<Box<dyn CompatibilityCheck>> {
    vec![
        Box::new(BrowserCheck),
        Box::new(PlatformCheck),
        Box::new(
            CapabilityCheck::new(components::LOCAL_STORAGE, Capabilities::LOCAL_STORAGE)
                .with_polyfill(Polyfill::LocalStorage),
        ),
        Box::new(
            CapabilityCheck::new(components::SESSION_STORAGE, Capabilities::SESSION_STORAGE)
                .with_polyfill(Polyfill::SessionStorage),
        ),
        Box::new(
            CapabilityCheck::new(components::INDEXED_DB, Capabilities::INDEXED_DB)
                .with_polyfill(Polyfill::IndexedDbOverLocalStorage),
        ),
        Box::new(CapabilityCheck::new(components::SERVICE_WORKER, Capabilities::SERVICE_WORKER)),
        Box::new(CapabilityCheck::new(components::WEBGL, Capabilities::WEBGL)),
        Box::new(CapabilityCheck::new(components::TOUCH, Capabilities::TOUCH)),
        Box::new(CapabilityCheck::new(components::WEB_WORKERS, Capabilities::WEB_WORKERS)),
        Box::new(CapabilityCheck::new(components::NOTIFICATIONS, Capabilities::NOTIFICATIONS)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use fstone_domain::BrowserInfo;

    fn env(browser_version: &str, platform: &str, caps: Capabilities) -> Environment {
        Environment {
            browser: BrowserInfo { name: "firefox".into(), version: browser_version.into() },
            platform: platform.into(),
            device_type: "desktop".into(),
            supported_features: caps,
        }
    }

    #[test]
    fn browser_ranges() {
        let req = CompatibilityRequirement::required("browser", "90").up_to("130");
        assert!(BrowserCheck.check(&req, &env("120.0.1", "", Capabilities::empty())).passed());
        assert!(matches!(
            BrowserCheck.check(&req, &env("89", "", Capabilities::empty())),
            CheckOutcome::Fail { severity: Severity::Error, suggestion: Some(_), .. }
        ));
        assert!(matches!(
            BrowserCheck.check(&req, &env("131", "", Capabilities::empty())),
            CheckOutcome::Fail { severity: Severity::Warning, .. }
        ));
        assert!(matches!(
            BrowserCheck.check(&req, &env("", "", Capabilities::empty())),
            CheckOutcome::Fail { severity: Severity::Warning, .. }
        ));
    }

    #[test]
    fn platform_versions() {
        let req = CompatibilityRequirement::required("platform", "15");
        assert!(PlatformCheck.check(&req, &env("1", "ios 17.2", Capabilities::empty())).passed());
        assert!(!PlatformCheck.check(&req, &env("1", "ios 14", Capabilities::empty())).passed());
        assert!(matches!(
            PlatformCheck.check(&req, &env("1", "linux", Capabilities::empty())),
            CheckOutcome::Fail { severity: Severity::Warning, .. }
        ));
    }

    #[test]
    fn indexed_db_polyfill_needs_local_storage() {
        let check = CapabilityCheck::new("indexed_db", Capabilities::INDEXED_DB)
            .with_polyfill(Polyfill::IndexedDbOverLocalStorage);

        let mut bare = env("1", "", Capabilities::empty());
        assert!(!check.remediate(&mut bare));

        let mut with_storage = env("1", "", Capabilities::LOCAL_STORAGE);
        assert!(check.remediate(&mut with_storage));
        assert!(with_storage.supports(Capabilities::INDEXED_DB));
        assert!(!check.remediate(&mut with_storage));
    }

    #[test]
    fn builtin_components_are_unique() {
        let checks = builtin_checks();
        let mut names: Vec<_> = checks.iter().map(|c| c.component().to_owned()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), checks.len());
    }
}
