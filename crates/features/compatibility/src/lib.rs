//! # Compatibility Checker
//!
//! Verifies that a feature's [`CompatibilityRequirement`](fstone_domain::CompatibilityRequirement)s
//! hold in the host [`Environment`](fstone_domain::Environment). One [`CompatibilityCheck`] runs
//! per named component; failures of required components become issues, failures of optional
//! ones become warnings. Unknown components fail.
//!
//! The environment itself comes from an [`EnvironmentProvider`]; [`StaticEnvironment`] serves a
//! fixed (replaceable) description.

mod check;
mod checker;
mod error;
mod provider;

pub use crate::check::{
    BrowserCheck, CapabilityCheck, CheckOutcome, CompatibilityCheck, PlatformCheck, Polyfill,
    builtin_checks,
};
pub use crate::checker::{CompatibilityChecker, CompatibilityIssue, CompatibilityReport};
pub use crate::error::{CompatibilityError, CompatibilityErrorExt};
pub use crate::provider::{EnvironmentProvider, StaticEnvironment};
