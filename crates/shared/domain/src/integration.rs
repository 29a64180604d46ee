use crate::environment::Environment;
use crate::feature::Feature;
use crate::migration::MigrationState;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// The committed enabled/disabled record of a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationState {
    pub enabled: bool,
    /// Unix milliseconds.
    pub changed_at: i64,
    #[serde(default)]
    pub user_id: Option<String>,
    pub version: String,
}

/// Read-only view of the whole system handed to validation rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSnapshot {
    pub features: Vec<Feature>,
    pub integration: BTreeMap<String, IntegrationState>,
    /// Aggregate migration state per feature id, for features that have tasks.
    pub migrations: BTreeMap<String, MigrationState>,
    /// Features that declare migration tasks.
    pub migration_required: BTreeSet<String>,
    pub environment: Option<Environment>,
}

impl SystemSnapshot {
    #[must_use]
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features, ..Self::default() }
    }

    #[must_use]
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// A feature counts as enabled if its committed state says so, falling back
    /// to the registry flag when no state was recorded yet.
    #[must_use]
    pub fn is_enabled(&self, id: &str) -> bool {
        self.integration
            .get(id)
            .map(|state| state.enabled)
            .or_else(|| self.feature(id).map(|f| f.enabled))
            .unwrap_or(false)
    }

    pub fn enabled_features(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter().filter(|f| self.is_enabled(&f.id))
    }
}
