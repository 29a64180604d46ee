use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumString};

/// Top-level platform configuration shared across components.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformConfigInner {
    pub flags: FlagSettings,
    pub compatibility: CompatibilitySettings,
    pub migration: MigrationSettings,
    pub validation: ValidationSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

/// Thin Arc-wrapped config for inexpensive cloning into components.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(flatten, default)]
    inner: Arc<PlatformConfigInner>,
}

impl Deref for PlatformConfig {
    type Target = PlatformConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for PlatformConfig {
    fn deref_mut(&mut self) -> &mut PlatformConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Flag evaluator cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlagSettings {
    pub cache_ttl_seconds: u64,
    pub cache_capacity: u64,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CompatibilityMode {
    /// Any failing check makes the feature incompatible.
    Strict,
    /// Only error-severity issues count.
    #[default]
    Lenient,
    /// Failing checks are remediated when possible, then re-evaluated once.
    Auto,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompatibilitySettings {
    pub mode: CompatibilityMode,
    pub cache_capacity: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    pub rollback_on_error: bool,
    /// Extra `execute` attempts for a failed task.
    pub retry_attempts: u32,
    /// Load the user's data, preferences and customizations into the migration context.
    pub snapshot_user_data: bool,
}

/// Budgets for the performance-impact and resource-usage rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub cpu_threshold: u32,
    pub memory_threshold: u32,
    pub network_threshold: u32,
    pub max_enabled_features: usize,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub root: PathBuf,
    pub compression: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub console: bool,
    pub json: bool,
    pub directory: Option<PathBuf>,
    pub filter: Option<String>,
    pub max_files: usize,
}

// --- Default ---

impl Default for FlagSettings {
    fn default() -> Self {
        Self { cache_ttl_seconds: 300, cache_capacity: 10_000 }
    }
}

impl Default for CompatibilitySettings {
    fn default() -> Self {
        Self { mode: CompatibilityMode::Lenient, cache_capacity: 1_024 }
    }
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self { rollback_on_error: true, retry_attempts: 0, snapshot_user_data: true }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self { cpu_threshold: 8, memory_threshold: 8, network_threshold: 6, max_enabled_features: 12 }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self { backend: StorageBackend::Memory, root: PathBuf::from("data"), compression: false }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            console: true,
            json: false,
            directory: None,
            filter: None,
            max_files: 10,
        }
    }
}
