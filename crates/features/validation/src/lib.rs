//! # Validation Engine
//!
//! A battery of system-wide [`ValidationRule`]s over a [`SystemSnapshot`]: dependency
//! completeness and cycles, version ranges, conflicts, rollout shape, performance budgets,
//! migration completion, and advisory browser/resource checks. Each rule reports
//! [`ValidationIssue`]s; the [`ValidationEngine`] folds them into a [`ValidationReport`] that is
//! `valid` iff no rule reported an error.
//!
//! Rules declare their metadata with `#[fstone_derive::validation_rule]`:
//!
//! ```rust
//! use fstone_validation::{SystemSnapshot, ValidationError, ValidationIssue, ValidationRule, RuleMetadata};
//!
//! #[fstone_derive::validation_rule(id = "no-beta", category = "rollout", severity = "warning")]
//! struct NoBetaRule;
//!
//! impl ValidationRule for NoBetaRule {
//!     fn validate(&self, snapshot: &SystemSnapshot) -> Result<Vec<ValidationIssue>, ValidationError> {
//!         Ok(snapshot
//!             .enabled_features()
//!             .filter(|f| f.beta)
//!             .map(|f| self.issue(format!("{} is still in beta", f.id)))
//!             .collect())
//!     }
//! }
//!
//! assert_eq!(NoBetaRule::ID, "no-beta");
//! ```

extern crate self as fstone_validation;

mod engine;
mod error;
mod rule;
pub mod rules;

pub use crate::engine::{ValidationEngine, ValidationReport, ValidationSummary};
pub use crate::error::{ValidationError, ValidationErrorExt};
pub use crate::rule::{RuleMetadata, ValidationRule};
pub use crate::rules::builtin_rules;
pub use fstone_domain::{RuleCategory, Severity, SystemSnapshot, ValidationIssue};
