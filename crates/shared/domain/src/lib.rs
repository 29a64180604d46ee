//! # Domain Models
//!
//! Pure data shared by every Flagstone crate: feature definitions, evaluation contexts,
//! host environments, migration and validation records, and the platform configuration.
//! Keep it lean: no I/O, no async, no caching. Timestamps are Unix milliseconds.

pub mod config;
pub mod constants;
pub mod context;
pub mod environment;
pub mod feature;
pub mod integration;
pub mod migration;
pub mod validation;
pub mod version;

pub use context::{AttributeValue, EvaluationContext, UserAttributes};
pub use environment::{BrowserInfo, Capabilities, Environment};
pub use feature::{
    CompatibilityRequirement, Feature, ImpactLevel, PerformanceImpact, RolloutStrategy,
};
pub use integration::{IntegrationState, SystemSnapshot};
pub use migration::{MigrationPriority, MigrationResult, MigrationState, MigrationStatus};
pub use validation::{RuleCategory, Severity, ValidationIssue};
