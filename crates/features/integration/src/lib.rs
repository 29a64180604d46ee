//! # Integration Coordinator
//!
//! Sequences the feature lifecycle across the platform components and owns the committed
//! enabled/disabled record of every feature.
//!
//! ```text
//! enable_feature(id, user)
//!   ├─ registry        unknown id → error, unmet dependencies → logged, not fatal
//!   ├─ compatibility   incompatible → error (a `compatibility_issue` event is emitted)
//!   ├─ rollout         strategy denies the user → Ok(false)
//!   ├─ migrations      run when a task has not completed; any failure → error, no commit
//!   └─ commit          flag + registry + `integration/<id>` record, `feature_enabled` event
//! ```
//!
//! `disable_feature` refuses while an enabled feature depends on the target. Workflows for the
//! same feature id never overlap. Reading operations (status, validation, health,
//! recommendations, export) never mutate state.

mod coordinator;
mod error;
mod health;
mod recommend;

pub use crate::coordinator::{BatchOutcome, Components, Coordinator, INTEGRATION_NAMESPACE, LoadSummary};
pub use crate::error::{IntegrationError, IntegrationErrorExt};
pub use crate::health::HealthStatus;
pub use crate::recommend::Recommendation;
