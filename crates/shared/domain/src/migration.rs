use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Lifecycle of one execution attempt of a migration task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationState {
    Pending,
    Running,
    Completed,
    Failed,
    RolledBack,
}

impl MigrationState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::RolledBack)
    }
}

/// Execution priority; declaration order is ascending so `Critical` sorts highest.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MigrationPriority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Outcome of a task operation (`validate`, `execute` or `rollback`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationResult {
    pub task_id: String,
    pub success: bool,
    pub message: String,
    /// Human readable list of the changes applied (or that would be applied on a dry run).
    pub changes: Vec<String>,
    pub error: Option<String>,
}

impl MigrationResult {
    pub fn success(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { task_id: task_id.into(), success: true, message: message.into(), ..Self::default() }
    }

    pub fn failure(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            task_id: task_id.into(),
            success: false,
            message: format!("Migration failed: {error}"),
            changes: Vec::new(),
            error: Some(error),
        }
    }

    #[must_use]
    pub fn with_change(mut self, change: impl Into<String>) -> Self {
        self.changes.push(change.into());
        self
    }
}

/// One status record in a task's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationStatus {
    /// Unique id of this execution attempt.
    pub id: String,
    pub task_id: String,
    pub feature: String,
    pub state: MigrationState,
    /// 0 to 100.
    pub progress: u8,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<i64>,
    #[serde(default)]
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub result: Option<MigrationResult>,
}
