use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// What happened to a feature.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    FeatureEnabled,
    FeatureDisabled,
    MigrationStarted,
    MigrationCompleted,
    CompatibilityIssue,
}

bitflags! {
    /// A set of [`EventKind`]s a subscription is interested in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventKinds: u8 {
        const FEATURE_ENABLED = 1 << 0;
        const FEATURE_DISABLED = 1 << 1;
        const MIGRATION_STARTED = 1 << 2;
        const MIGRATION_COMPLETED = 1 << 3;
        const COMPATIBILITY_ISSUE = 1 << 4;

        const LIFECYCLE = Self::FEATURE_ENABLED.bits() | Self::FEATURE_DISABLED.bits();
        const MIGRATION = Self::MIGRATION_STARTED.bits() | Self::MIGRATION_COMPLETED.bits();
    }
}

impl From<EventKind> for EventKinds {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::FeatureEnabled => Self::FEATURE_ENABLED,
            EventKind::FeatureDisabled => Self::FEATURE_DISABLED,
            EventKind::MigrationStarted => Self::MIGRATION_STARTED,
            EventKind::MigrationCompleted => Self::MIGRATION_COMPLETED,
            EventKind::CompatibilityIssue => Self::COMPATIBILITY_ISSUE,
        }
    }
}

impl EventKinds {
    /// Whether `kind` is part of this set.
    #[must_use]
    pub fn includes(self, kind: EventKind) -> bool {
        self.contains(kind.into())
    }
}

/// A structured event emitted by the integration coordinator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationEvent {
    pub kind: EventKind,
    pub feature: String,
    #[serde(default)]
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl IntegrationEvent {
    /// Creates an event stamped with the current UTC time.
    pub fn new(kind: EventKind, feature: impl Into<String>, data: serde_json::Value) -> Self {
        Self { kind, feature: feature.into(), data, timestamp: Utc::now() }
    }
}
