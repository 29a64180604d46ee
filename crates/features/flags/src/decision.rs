use serde::{Deserialize, Serialize};

/// The evaluation step that decided a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DecisionReason {
    UnknownFlag,
    Disabled,
    GroupMismatch,
    OutsideRollout { bucket: u32 },
    ConditionFailed { index: usize },
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagDecision {
    pub enabled: bool,
    #[serde(flatten)]
    pub reason: DecisionReason,
}

impl FlagDecision {
    pub(crate) const fn off(reason: DecisionReason) -> Self {
        Self { enabled: false, reason }
    }

    pub(crate) const fn on() -> Self {
        Self { enabled: true, reason: DecisionReason::Enabled }
    }
}
