use crate::error::{IntegrationError, IntegrationErrorExt};
use crate::health::{Drift, HealthStatus, assess};
use crate::recommend::{Recommendation, recommend};
use fstone_compat::{CompatibilityChecker, EnvironmentProvider};
use fstone_domain::{
    Environment, EvaluationContext, Feature, IntegrationState, MigrationStatus,
    SystemSnapshot, UserAttributes,
};
use fstone_events::{EventBus, EventKind, EventKinds, IntegrationEvent, Subscription};
use fstone_flags::{FlagDefinition, FlagEvaluator, FlagOptions, ImportSummary, is_eligible};
use fstone_kernel::time::{now_millis, to_rfc3339};
use fstone_migration::MigrationOrchestrator;
use fstone_registry::FeatureRegistry;
use fstone_storage::{KeyValueStore, NamespacedStore, SharedStore, encode_segment, join_key};
use fstone_validation::{ValidationEngine, ValidationReport};
use fxhash::FxHashMap;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Store namespace holding the committed [`IntegrationState`] of each feature.
pub const INTEGRATION_NAMESPACE: &str = "integration";
const USERS_NAMESPACE: &str = "users";
const ATTRIBUTES: &str = "attributes";

/// The collaborators a [`Coordinator`] sequences.
#[derive(Debug, Clone)]
pub struct Components {
    pub registry: FeatureRegistry,
    pub flags: FlagEvaluator,
    pub compatibility: CompatibilityChecker,
    pub migrations: MigrationOrchestrator,
    pub validation: ValidationEngine,
    pub environment: Arc<dyn EnvironmentProvider>,
    pub events: EventBus,
    pub store: SharedStore,
}

/// Result of one entry of [`Coordinator::enable_features`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub feature: String,
    pub enabled: bool,
    pub error: Option<String>,
}

/// What [`Coordinator::load`] found in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub flags: usize,
    pub migrations: usize,
    pub states: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
    feature: String,
    #[serde(flatten)]
    state: IntegrationState,
}

#[derive(Debug, Serialize)]
struct ConfigurationExport {
    features: Vec<Feature>,
    enabled_features: Vec<String>,
    integration_status: BTreeMap<String, IntegrationState>,
    flags: BTreeMap<String, FlagDefinition>,
    timestamp: String,
}

/// Sequences the enable/disable workflow across registry, compatibility checker, migration
/// orchestrator and flag evaluator, and owns the committed [`IntegrationState`] of each feature.
///
/// Enabling runs: dependency check (advisory, logged) → compatibility (hard failure) →
/// rollout eligibility (`Ok(false)` when denied) → migrations if needed → flag commit, state
/// record and event. Calls for the same feature id are serialized for the whole workflow, so
/// overlapping enables never run the same migrations twice. Clones share all state.
#[derive(Debug, Clone)]
pub struct Coordinator {
    components: Components,
    states: Arc<RwLock<FxHashMap<String, IntegrationState>>>,
    locks: Arc<Mutex<FxHashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
    state_store: NamespacedStore,
}

impl Coordinator {
    /// # Errors
    /// Returns [`IntegrationError::Storage`] if the state namespace cannot be created.
    pub fn new(components: Components) -> Result<Self, IntegrationError> {
        let state_store = NamespacedStore::new(Arc::clone(&components.store), INTEGRATION_NAMESPACE)?;
        Ok(Self { components, states: Arc::default(), locks: Arc::default(), state_store })
    }

    #[must_use]
    pub const fn components(&self) -> &Components {
        &self.components
    }

    /// Adds `feature` to the registry and makes sure a flag backs it.
    ///
    /// A flag already present (e.g. reloaded from the store) keeps its committed switch and the
    /// registry follows it; its percentage and groups are replaced by the feature's rollout
    /// strategy. A new flag starts with the feature's declared `enabled` value. A strategy the
    /// flag evaluator rejects leaves both registry and flags untouched.
    ///
    /// # Errors
    /// Returns a flag or registry error if the backing flag is invalid or cannot be persisted.
    pub async fn register_feature(&self, feature: Feature) -> Result<(), IntegrationError> {
        let id = feature.id.clone();
        let declared = feature.enabled;
        let options = backing_options(&feature)?;

        let flags = &self.components.flags;
        if flags.ensure_registered(&id, options.clone()).await? {
            if declared {
                flags.enable(&id).await?;
            }
        } else if flags.retarget(&id, &options).await? {
            warn!(
                feature = %id,
                strategy = feature.rollout_strategy.kind(),
                "Flag targeting replaced by the feature's rollout strategy"
            );
        }

        self.components.registry.register(feature);
        self.components.registry.set_enabled(&id, flags.is_committed(&id))?;
        debug!(feature = %id, enabled = flags.is_committed(&id), "Feature registered");
        Ok(())
    }

    /// Runs the enable workflow for `id` on behalf of `user_id`.
    ///
    /// Returns `Ok(true)` once the feature is committed (or already was) and `Ok(false)` when
    /// its rollout strategy does not admit the user.
    ///
    /// # Errors
    /// * [`IntegrationError::UnknownFeature`] for an unregistered id;
    /// * [`IntegrationError::CompatibilityFailure`] if the environment cannot host the feature;
    /// * [`IntegrationError::MigrationFailed`] if a migration task failed (nothing is committed);
    /// * wrapped component errors for storage or provider failures.
    pub async fn enable_feature(&self, id: &str, user_id: Option<&str>) -> Result<bool, IntegrationError> {
        let lock = self.feature_lock(id)?;
        let _guard = lock.lock().await;

        let Components { registry, flags, compatibility, migrations, environment, .. } = &self.components;
        let feature = registry.get(id).ok_or_else(|| IntegrationError::unknown(id))?;
        if registry.is_enabled(id) {
            debug!(feature = %id, "Feature already enabled");
            return Ok(true);
        }

        let unmet = registry.unmet_dependencies(&feature);
        if !unmet.is_empty() {
            warn!(feature = %id, unmet = ?unmet, "Enabling feature with unmet dependencies");
        }

        // the flag must be committable before any migration touches user data
        flags.ensure_registered(id, backing_options(&feature)?).await?;

        let environment = environment.environment().await.context("read environment")?;
        let report = compatibility.validate(&feature, &environment);
        if !report.issues.is_empty() || !report.warnings.is_empty() {
            self.emit(EventKind::CompatibilityIssue, id, json!({
                "compatible": report.compatible,
                "issues": report.issues,
                "warnings": report.warnings,
                "suggestions": report.suggestions,
            }));
        }
        if !report.compatible {
            let message = report.issues.iter().map(|i| i.message.as_str()).collect::<Vec<_>>().join("; ");
            warn!(feature = %id, mode = %report.mode, "Feature rejected by compatibility checks");
            return Err(IntegrationError::CompatibilityFailure {
                message: format!("{id}: {message}").into(),
                issues: report.issues,
                context: None,
            });
        }

        let ctx = self.user_context(user_id, Some(&environment)).await?;
        if !is_eligible(&feature.rollout_strategy, id, &ctx) {
            info!(
                feature = %id,
                user_id = ctx.bucket_key(),
                strategy = feature.rollout_strategy.kind(),
                "User is not eligible for rollout"
            );
            return Ok(false);
        }

        if migrations.check_needed(id) {
            self.emit(EventKind::MigrationStarted, id, json!({
                "user_id": user_id,
                "tasks": migrations.tasks_for(id).len(),
            }));
            let run = migrations.run(&feature, user_id).await?;
            if !run.success() {
                let message = run
                    .failures()
                    .iter()
                    .map(|r| format!("{}: {}", r.task_id, r.error.as_deref().unwrap_or("failed")))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(IntegrationError::MigrationFailed {
                    message: message.into(),
                    results: run.results,
                    context: None,
                });
            }
            self.emit(EventKind::MigrationCompleted, id, json!({
                "user_id": user_id,
                "results": run.results,
            }));
        }

        self.commit(&feature, true, user_id).await?;
        Ok(true)
    }

    /// Disables `id`. A feature that is already off is left untouched.
    ///
    /// # Errors
    /// [`IntegrationError::DisableBlockedByDependents`] while an enabled feature depends on
    /// `id`; [`IntegrationError::UnknownFeature`] for an unregistered id.
    pub async fn disable_feature(&self, id: &str, user_id: Option<&str>) -> Result<(), IntegrationError> {
        let lock = self.feature_lock(id)?;
        let _guard = lock.lock().await;

        let registry = &self.components.registry;
        let feature = registry.get(id).ok_or_else(|| IntegrationError::unknown(id))?;

        let dependents = registry.enabled_dependents(id);
        if !dependents.is_empty() {
            return Err(IntegrationError::DisableBlockedByDependents {
                message: format!("{id} is required by {}", dependents.join(", ")).into(),
                dependents,
                context: None,
            });
        }

        if !feature.enabled && !self.components.flags.is_committed(id) {
            debug!(feature = %id, "Feature already disabled");
            return Ok(());
        }
        self.commit(&feature, false, user_id).await
    }

    /// Enables `ids` dependencies first. Every id gets an outcome; a failure does not stop
    /// the batch.
    pub async fn enable_features(&self, ids: &[String], user_id: Option<&str>) -> Vec<BatchOutcome> {
        let order = self.components.registry.order_by_dependencies(ids);
        let mut outcomes = Vec::with_capacity(order.len());
        for id in order {
            let outcome = match self.enable_feature(&id, user_id).await {
                Ok(enabled) => BatchOutcome { feature: id, enabled, error: None },
                Err(err) => {
                    warn!(feature = %id, error = %err, "Batch enable failed for feature");
                    BatchOutcome { feature: id, enabled: false, error: Some(err.to_string()) }
                },
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// The committed switch of `id`.
    #[must_use]
    pub fn is_feature_enabled(&self, id: &str) -> bool {
        self.components.registry.is_enabled(id)
    }

    /// Per-user evaluation through the flag evaluator (groups, rollout, conditions).
    #[must_use]
    pub fn is_feature_enabled_for(&self, id: &str, ctx: &EvaluationContext) -> bool {
        self.components.flags.is_enabled(id, ctx)
    }

    #[must_use]
    pub fn available_features(&self) -> Vec<Feature> {
        self.components.registry.features()
    }

    #[must_use]
    pub fn integration_status(&self) -> BTreeMap<String, IntegrationState> {
        self.states.read().iter().map(|(id, s)| (id.clone(), s.clone())).collect()
    }

    #[must_use]
    pub fn migration_history(&self, feature: &str) -> Vec<MigrationStatus> {
        self.components.migrations.feature_history(feature)
    }

    pub fn subscribe(&self) -> Subscription {
        self.components.events.subscribe()
    }

    pub fn subscribe_to(&self, kinds: EventKinds) -> Subscription {
        self.components.events.subscribe_to(kinds)
    }

    /// Stores the attributes used to build `user_id`'s evaluation context.
    ///
    /// # Errors
    /// Returns a storage error if the document cannot be written.
    pub async fn set_user_attributes(
        &self,
        user_id: &str,
        attributes: &UserAttributes,
    ) -> Result<(), IntegrationError> {
        let key = attributes_key(user_id)?;
        let raw = serde_json::to_string(attributes).context("serialize user attributes")?;
        self.components.store.set(&key, &raw).await.context("write user attributes")
    }

    /// Everything the validation rules look at, as of now.
    pub async fn system_snapshot(&self) -> SystemSnapshot {
        SystemSnapshot {
            features: self.components.registry.features(),
            integration: self.integration_status(),
            migrations: self.components.migrations.states(),
            migration_required: self.components.migrations.features_requiring_migration(),
            environment: self.current_environment().await,
        }
    }

    pub async fn validate_integration(&self) -> ValidationReport {
        let report = self.components.validation.validate(&self.system_snapshot().await);
        info!(
            valid = report.valid,
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            "Integration validated"
        );
        report
    }

    /// Disabled features worth offering to `user_id`.
    ///
    /// # Errors
    /// Returns a storage error if the user's attributes cannot be read.
    pub async fn recommendations(&self, user_id: Option<&str>) -> Result<Vec<Recommendation>, IntegrationError> {
        let environment = self.current_environment().await;
        let ctx = self.user_context(user_id, environment.as_ref()).await?;
        let registry = &self.components.registry;
        Ok(recommend(&registry.features(), |id| registry.is_enabled(id), &ctx, environment.as_ref()))
    }

    /// Validation results, registry/flag drift and failed migrations folded into one summary.
    pub async fn health_status(&self) -> HealthStatus {
        let report = self.validate_integration().await;
        let flags = &self.components.flags;
        let drift: Vec<Drift> = self
            .components
            .registry
            .features()
            .into_iter()
            .filter(|f| flags.contains(&f.id) && flags.is_committed(&f.id) != f.enabled)
            .map(|f| Drift { flag: flags.is_committed(&f.id), registry: f.enabled, feature: f.id })
            .collect();

        let status = assess(&report, &drift, &self.components.migrations.states());
        if !status.healthy {
            warn!(issues = status.issues.len(), "Integration is unhealthy");
        }
        status
    }

    /// `{features, enabled_features, integration_status, flags, timestamp}` as pretty JSON.
    ///
    /// # Errors
    /// Returns [`IntegrationError::Serialize`] if serialization fails.
    pub fn export_configuration(&self) -> Result<String, IntegrationError> {
        let registry = &self.components.registry;
        let export = ConfigurationExport {
            features: registry.features(),
            enabled_features: registry.enabled_ids(),
            integration_status: self.integration_status(),
            flags: self.components.flags.snapshot(),
            timestamp: to_rfc3339(now_millis()),
        };
        serde_json::to_string_pretty(&export).context("export configuration")
    }

    /// Imports flag definitions (see [`FlagEvaluator::import_flags`]) and aligns the registry
    /// with the imported switches.
    ///
    /// # Errors
    /// Returns [`IntegrationError::Flag`] if the document is unusable or cannot be persisted.
    pub async fn import_flags(&self, json: &str) -> Result<ImportSummary, IntegrationError> {
        let summary = self.components.flags.import_flags(json).await?;
        self.sync_registry();
        Ok(summary)
    }

    /// Reloads flags, migration histories and integration states from the store, then aligns
    /// the registry with the committed flags.
    ///
    /// Run it before [`Coordinator::register_feature`]: registering a feature whose flag is not
    /// in memory yet writes a fresh, disabled definition over the stored one.
    ///
    /// # Errors
    /// Returns a wrapped component error if the store cannot be listed or read.
    pub async fn load(&self) -> Result<LoadSummary, IntegrationError> {
        let flags = self.components.flags.load().await?;
        let migrations = self.components.migrations.load().await?;

        let mut states = 0;
        for key in self.state_store.keys("").await? {
            let Some(raw) = self.state_store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<StateRecord>(&raw) {
                Ok(record) => {
                    self.states.write().insert(record.feature, record.state);
                    states += 1;
                },
                Err(err) => warn!(key = %key, error = %err, "Skipping unreadable integration state"),
            }
        }

        self.sync_registry();
        let summary = LoadSummary { flags, migrations, states };
        info!(flags, migrations, states, "Integration state loaded");
        Ok(summary)
    }

    async fn commit(&self, feature: &Feature, enabled: bool, user_id: Option<&str>) -> Result<(), IntegrationError> {
        let Components { registry, flags, .. } = &self.components;
        flags.ensure_registered(&feature.id, FlagOptions::from_strategy(&feature.rollout_strategy)).await?;
        flags.set_enabled(&feature.id, enabled).await?;
        registry.set_enabled(&feature.id, enabled)?;

        let state = IntegrationState {
            enabled,
            changed_at: now_millis(),
            user_id: user_id.map(str::to_owned),
            version: feature.version.clone(),
        };
        let record = StateRecord { feature: feature.id.clone(), state };
        let raw = serde_json::to_string(&record).context("serialize integration state")?;
        self.state_store.set(&encode_segment(&feature.id), &raw).await.context("persist integration state")?;
        self.states.write().insert(record.feature, record.state);

        let kind = if enabled { EventKind::FeatureEnabled } else { EventKind::FeatureDisabled };
        self.emit(kind, &feature.id, json!({ "user_id": user_id, "version": feature.version }));
        info!(feature = %feature.id, enabled, user_id = user_id.unwrap_or_default(), "Feature state committed");
        Ok(())
    }

    fn emit(&self, kind: EventKind, feature: &str, data: serde_json::Value) {
        let receivers = self.components.events.publish(IntegrationEvent::new(kind, feature, data));
        debug!(feature, kind = %kind, receivers, "Integration event published");
    }

    /// Locks exist only for registered ids.
    fn feature_lock(&self, id: &str) -> Result<Arc<tokio::sync::Mutex<()>>, IntegrationError> {
        if !self.components.registry.contains(id) {
            return Err(IntegrationError::unknown(id));
        }
        Ok(Arc::clone(self.locks.lock().entry(id.to_owned()).or_default()))
    }

    fn sync_registry(&self) {
        let Components { registry, flags, .. } = &self.components;
        let states = self.states.read();
        for feature in registry.features() {
            let committed = if flags.contains(&feature.id) {
                flags.is_committed(&feature.id)
            } else if let Some(state) = states.get(&feature.id) {
                state.enabled
            } else {
                continue;
            };
            if committed == feature.enabled {
                continue;
            }
            match registry.set_enabled(&feature.id, committed) {
                Ok(()) => debug!(feature = %feature.id, enabled = committed, "Registry synchronized with flag"),
                Err(err) => warn!(feature = %feature.id, error = %err, "Registry synchronization failed"),
            }
        }
    }

    async fn current_environment(&self) -> Option<Environment> {
        match self.components.environment.environment().await {
            Ok(environment) => Some(environment),
            Err(err) => {
                warn!(error = %err, "Environment provider failed");
                None
            },
        }
    }

    async fn user_context(
        &self,
        user_id: Option<&str>,
        environment: Option<&Environment>,
    ) -> Result<EvaluationContext, IntegrationError> {
        let mut ctx = match user_id {
            Some(user) => {
                let mut ctx = EvaluationContext::for_user(user);
                ctx.user_attributes = self.user_attributes(user).await?;
                ctx
            },
            None => EvaluationContext::anonymous(),
        };
        if let Some(env) = environment {
            if !env.device_type.is_empty() {
                ctx.device_type = Some(env.device_type.clone());
            }
            if !env.browser.name.is_empty() {
                ctx.browser = Some(env.browser.name.clone());
            }
        }
        ctx.timestamp = now_millis();
        Ok(ctx)
    }

    async fn user_attributes(&self, user_id: &str) -> Result<UserAttributes, IntegrationError> {
        let key = attributes_key(user_id)?;
        let Some(raw) = self.components.store.get(&key).await.context("read user attributes")? else {
            return Ok(UserAttributes::default());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(user_id, error = %err, "Ignoring unreadable user attributes");
            UserAttributes::default()
        }))
    }
}

/// Flag options derived from the rollout strategy, checked the way the flag evaluator will.
fn backing_options(feature: &Feature) -> Result<FlagOptions, IntegrationError> {
    let options = FlagOptions::from_strategy(&feature.rollout_strategy);
    FlagDefinition::new(&feature.id, feature.enabled, options.clone()).validate()?;
    Ok(options)
}

fn attributes_key(user_id: &str) -> Result<String, IntegrationError> {
    join_key([USERS_NAMESPACE, encode_segment(user_id).as_str(), ATTRIBUTES]).context("user attributes key")
}


#[cfg(test)]
mod tests {
    use super::*;
    use fstone_compat::StaticEnvironment;
    use fstone_domain::config::PlatformConfig;
    use fstone_storage::MemoryStore;

    fn coordinator() -> Coordinator {
        let config = PlatformConfig::default();
        let store: SharedStore = Arc::new(MemoryStore::new());
        let components = Components {
            registry: FeatureRegistry::new(),
            flags: FlagEvaluator::new(Arc::clone(&store), &config.flags).unwrap(),
            compatibility: CompatibilityChecker::new(&config.compatibility),
            migrations: MigrationOrchestrator::new(Arc::clone(&store), &config.migration).unwrap(),
            validation: ValidationEngine::new(&config.validation),
            environment: Arc::new(StaticEnvironment::default()),
            events: EventBus::new(),
            store,
        };
        Coordinator::new(components).unwrap()
    }

    #[tokio::test]
    async fn unknown_ids_get_no_lock() {
        let c = coordinator();
        c.register_feature(Feature::new("known", "Known")).await.unwrap();

        for id in ["ghost-1", "ghost-2"] {
            assert!(c.enable_feature(id, None).await.is_err());
            assert!(c.disable_feature(id, None).await.is_err());
        }
        assert!(c.locks.lock().is_empty());

        c.enable_feature("known", None).await.unwrap();
        assert_eq!(c.locks.lock().len(), 1);
    }
}
