//! # Feature Registry
//!
//! Holds the feature catalog and answers dependency-graph queries for the rest of the
//! engine. The registry is pure data: it never enforces acyclicity (the validation engine
//! reports cycles) and it does not decide whether a feature *may* be enabled, it only records
//! the committed state.
//!
//! Clones share the same catalog.
//!
//! ```rust
//! use fstone_domain::Feature;
//! use fstone_registry::FeatureRegistry;
//!
//! let registry = FeatureRegistry::new();
//! registry.register(Feature::new("search", "Search"));
//! registry.register(Feature::new("filters", "Filters").depends_on("search"));
//!
//! assert_eq!(registry.dependents("search"), vec!["filters"]);
//! assert!(!registry.dependencies_satisfied(&registry.get("filters").unwrap()));
//! ```

pub mod catalog;
mod error;
mod graph;

pub use crate::error::{RegistryError, RegistryErrorExt};
use fstone_domain::Feature;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct RegistryInner {
    features: FxHashMap<String, Feature>,
    order: Vec<String>,
}

/// Shared, thread-safe feature catalog.
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl FeatureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with `features`, in iteration order.
    pub fn with_features(features: impl IntoIterator<Item = Feature>) -> Self {
        let registry = Self::new();
        for feature in features {
            registry.register(feature);
        }
        registry
    }

    /// Adds `feature`, replacing (and returning) a previous definition with the same id.
    /// A replaced feature keeps its original position.
    pub fn register(&self, feature: Feature) -> Option<Feature> {
        let mut inner = self.inner.write();
        let id = feature.id.clone();
        let previous = inner.features.insert(id.clone(), feature);
        if previous.is_some() {
            warn!(feature = %id, "Feature re-registered; previous definition replaced");
        } else {
            debug!(feature = %id, "Feature registered");
            inner.order.push(id);
        }
        previous
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<Feature> {
        self.inner.read().features.get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().features.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every feature, in registration order.
    #[must_use]
    pub fn features(&self) -> Vec<Feature> {
        let inner = self.inner.read();
        inner.order.iter().filter_map(|id| inner.features.get(id).cloned()).collect()
    }

    #[must_use]
    pub fn is_enabled(&self, id: &str) -> bool {
        self.inner.read().features.get(id).is_some_and(|f| f.enabled)
    }

    /// Ids of the enabled features, in registration order.
    #[must_use]
    pub fn enabled_ids(&self) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter(|id| inner.features.get(id.as_str()).is_some_and(|f| f.enabled))
            .cloned()
            .collect()
    }

    /// Records the committed state of a feature.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownFeature`] if `id` is not registered.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        let feature = inner.features.get_mut(id).ok_or_else(|| RegistryError::unknown(id))?;
        feature.enabled = enabled;
        Ok(())
    }

    /// Ids of the features that list `id` as a direct dependency (reverse edges).
    #[must_use]
    pub fn dependents(&self, id: &str) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter(|other| inner.features.get(other.as_str()).is_some_and(|f| f.depends_on_id(id)))
            .cloned()
            .collect()
    }

    /// Like [`FeatureRegistry::dependents`], restricted to enabled features.
    #[must_use]
    pub fn enabled_dependents(&self, id: &str) -> Vec<String> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter(|other| {
                inner.features.get(other.as_str()).is_some_and(|f| f.enabled && f.depends_on_id(id))
            })
            .cloned()
            .collect()
    }

    /// True iff every dependency of `feature` is registered and enabled.
    #[must_use]
    pub fn dependencies_satisfied(&self, feature: &Feature) -> bool {
        self.unmet_dependencies(feature).is_empty()
    }

    /// Dependencies of `feature` that are unknown or disabled.
    #[must_use]
    pub fn unmet_dependencies(&self, feature: &Feature) -> Vec<String> {
        let inner = self.inner.read();
        feature
            .dependencies
            .iter()
            .filter(|dep| !inner.features.get(dep.as_str()).is_some_and(|f| f.enabled))
            .cloned()
            .collect()
    }

    /// Reorders `ids` so that dependencies precede their dependents.
    ///
    /// Stable for independent ids, drops duplicates, keeps unknown ids, and tolerates cycles.
    #[must_use]
    pub fn order_by_dependencies(&self, ids: &[String]) -> Vec<String> {
        graph::dependency_order(&self.inner.read().features, ids)
    }
}
