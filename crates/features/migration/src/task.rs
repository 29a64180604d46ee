use crate::context::MigrationContext;
use crate::error::MigrationError;
use async_trait::async_trait;
use fstone_domain::{MigrationPriority, MigrationResult};
use serde::Serialize;
use std::fmt::Debug;

/// Static description of a migration task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSpec {
    pub id: String,
    pub feature: String,
    pub description: String,
    /// Ids of tasks that must be `Completed` first.
    pub dependencies: Vec<String>,
    pub priority: MigrationPriority,
    pub rollback_supported: bool,
}

impl TaskSpec {
    pub fn new(id: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            feature: feature.into(),
            description: String::new(),
            dependencies: Vec::new(),
            priority: MigrationPriority::default(),
            rollback_supported: false,
        }
    }

    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn after(mut self, task: impl Into<String>) -> Self {
        self.dependencies.push(task.into());
        self
    }

    #[must_use]
    pub const fn priority(mut self, priority: MigrationPriority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn reversible(mut self) -> Self {
        self.rollback_supported = true;
        self
    }
}

/// An idempotent transformation of a user's snapshot, tied to one feature.
///
/// `execute` and `rollback` mutate [`MigrationContext::snapshot`]; the orchestrator persists the
/// snapshot afterwards unless the run is a dry run. Returning `Err` or an unsuccessful
/// [`MigrationResult`] both count as failure.
#[async_trait]
pub trait MigrationTask: Debug + Send + Sync {
    fn spec(&self) -> &TaskSpec;

    /// Precondition checked before `execute`; `false` fails the task without executing it.
    async fn validate(&self, _ctx: &MigrationContext) -> Result<bool, MigrationError> {
        Ok(true)
    }

    async fn execute(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError>;

    /// Reverses `execute`. Only called when [`TaskSpec::rollback_supported`] is set.
    async fn rollback(&self, _ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        Err(MigrationError::task_failed(format!("{} does not support rollback", self.spec().id)))
    }
}
