use async_trait::async_trait;
use fstone_compat::{CompatibilityChecker, StaticEnvironment};
use fstone_domain::config::PlatformConfig;
use fstone_domain::constants::{ADVANCED_SEARCH, ENHANCED_NAVIGATION, KEYBOARD_SHORTCUTS, MOBILE_OPTIMIZATION};
use fstone_domain::{
    Capabilities, CompatibilityRequirement, Environment, EvaluationContext, Feature, MigrationResult,
    MigrationState, RolloutStrategy, UserAttributes,
};
use fstone_events::{EventBus, EventKind};
use fstone_flags::FlagEvaluator;
use fstone_integration::{Components, Coordinator, IntegrationError};
use fstone_migration::{MigrationContext, MigrationError, MigrationOrchestrator, MigrationTask, TaskSpec};
use fstone_registry::FeatureRegistry;
use fstone_storage::{MemoryStore, SharedStore};
use fstone_validation::ValidationEngine;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
struct CountingTask {
    spec: TaskSpec,
    fail: bool,
    executions: AtomicUsize,
}

impl CountingTask {
    fn new(id: &str, feature: &str, fail: bool) -> Arc<Self> {
        Arc::new(Self { spec: TaskSpec::new(id, feature), fail, executions: AtomicUsize::new(0) })
    }

    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MigrationTask for CountingTask {
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    async fn execute(&self, _ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail {
            return Err(MigrationError::task_failed("disk full"));
        }
        Ok(MigrationResult::success(&self.spec.id, "migrated"))
    }
}

fn coordinator_on(store: &SharedStore, environment: Environment) -> Coordinator {
    let config = PlatformConfig::default();
    let components = Components {
        registry: FeatureRegistry::new(),
        flags: FlagEvaluator::new(Arc::clone(store), &config.flags).unwrap(),
        compatibility: CompatibilityChecker::new(&config.compatibility),
        migrations: MigrationOrchestrator::new(Arc::clone(store), &config.migration).unwrap(),
        validation: ValidationEngine::new(&config.validation),
        environment: Arc::new(StaticEnvironment::new(environment)),
        events: EventBus::new(),
        store: Arc::clone(store),
    };
    Coordinator::new(components).unwrap()
}

fn coordinator() -> Coordinator {
    coordinator_on(&(Arc::new(MemoryStore::new()) as SharedStore), Environment::default())
}

async fn with_features(coordinator: &Coordinator, features: Vec<Feature>) {
    for feature in features {
        coordinator.register_feature(feature).await.unwrap();
    }
}

fn chain() -> Vec<Feature> {
    vec![Feature::new("a", "A"), Feature::new("b", "B").depends_on("a")]
}

#[tokio::test]
async fn disable_is_blocked_while_dependents_are_enabled() {
    let c = coordinator();
    with_features(&c, chain()).await;
    assert!(c.enable_feature("a", Some("u1")).await.unwrap());
    assert!(c.enable_feature("b", Some("u1")).await.unwrap());

    let err = c.disable_feature("a", Some("u1")).await.unwrap_err();
    assert!(
        matches!(&err, IntegrationError::DisableBlockedByDependents { dependents, .. } if dependents == &["b"])
    );
    assert!(c.is_feature_enabled("a"));

    c.disable_feature("b", Some("u1")).await.unwrap();
    c.disable_feature("a", Some("u1")).await.unwrap();
    assert!(!c.is_feature_enabled("a"));
    assert!(!c.integration_status()["a"].enabled);
    assert_eq!(c.integration_status()["a"].user_id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn unknown_features_fail_fast() {
    let c = coordinator();
    assert!(matches!(c.enable_feature("ghost", None).await, Err(IntegrationError::UnknownFeature { .. })));
    assert!(matches!(c.disable_feature("ghost", None).await, Err(IntegrationError::UnknownFeature { .. })));
}

#[tokio::test]
async fn unmet_dependencies_are_tolerated_but_reported_by_validation() {
    let c = coordinator();
    with_features(&c, chain()).await;

    assert!(c.enable_feature("b", None).await.unwrap());

    let report = c.validate_integration().await;
    assert!(!report.valid);
    assert_eq!(report.by_rule("dependency-chain").count(), 1);
}

#[tokio::test]
async fn incompatible_features_are_rejected_with_an_event() {
    let c = coordinator();
    let mut events = c.subscribe();
    with_features(&c, vec![Feature::new("3d", "3D").requires(CompatibilityRequirement::required("webgl", "1"))])
        .await;

    let err = c.enable_feature("3d", None).await.unwrap_err();

    let IntegrationError::CompatibilityFailure { issues, .. } = &err else {
        panic!("expected a compatibility failure, got {err}");
    };
    assert_eq!(issues[0].component, "webgl");
    assert!(!c.is_feature_enabled("3d"));
    assert_eq!(events.try_recv().unwrap().kind, EventKind::CompatibilityIssue);
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn compatible_environment_admits_the_feature() {
    let env = Environment { supported_features: Capabilities::WEBGL, ..Environment::default() };
    let c = coordinator_on(&(Arc::new(MemoryStore::new()) as SharedStore), env);
    with_features(&c, vec![Feature::new("3d", "3D").requires(CompatibilityRequirement::required("webgl", "1"))])
        .await;

    assert!(c.enable_feature("3d", None).await.unwrap());
}

#[tokio::test]
async fn ineligible_users_get_false_instead_of_an_error() {
    let c = coordinator();
    with_features(&c, vec![Feature::new("labs", "Labs").rollout(RolloutStrategy::beta(["qa"]))]).await;

    assert!(!c.enable_feature("labs", Some("u1")).await.unwrap());
    assert!(!c.is_feature_enabled("labs"));

    let attributes = UserAttributes { groups: vec!["qa".into()], ..UserAttributes::default() };
    c.set_user_attributes("u1", &attributes).await.unwrap();
    assert!(c.enable_feature("labs", Some("u1")).await.unwrap());
    assert!(c.is_feature_enabled_for("labs", &EvaluationContext::for_user("u1").with_groups(["qa"])));
    assert!(!c.is_feature_enabled_for("labs", &EvaluationContext::for_user("u2")));
}

#[tokio::test]
async fn failed_migration_commits_nothing() {
    let c = coordinator();
    with_features(&c, vec![Feature::new("f", "F")]).await;
    c.components().migrations.register_task(CountingTask::new("m1", "f", true)).unwrap();

    let err = c.enable_feature("f", Some("u1")).await.unwrap_err();

    let IntegrationError::MigrationFailed { results, .. } = &err else {
        panic!("expected a migration failure, got {err}");
    };
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
    assert!(!c.is_feature_enabled("f"));
    assert!(!c.components().flags.is_committed("f"));
    assert!(c.integration_status().is_empty());
    assert_eq!(c.migration_history("f").last().map(|s| s.state), Some(MigrationState::Failed));
}

#[tokio::test]
async fn invalid_rollout_is_rejected_before_registration() {
    let c = coordinator();

    let err = c.register_feature(Feature::new("f", "F").rollout(RolloutStrategy::gradual(150.0))).await.unwrap_err();

    assert!(matches!(err, IntegrationError::Flag { .. }));
    assert!(!c.components().registry.contains("f"));
    assert!(!c.components().flags.contains("f"));
    assert!(matches!(c.enable_feature("f", Some("u1")).await, Err(IntegrationError::UnknownFeature { .. })));
}

#[tokio::test]
async fn invalid_backing_flag_stops_enable_before_migrations() {
    let c = coordinator();
    c.components().registry.register(Feature::new("f", "F").rollout(RolloutStrategy::gradual(150.0)));
    let task = CountingTask::new("m1", "f", false);
    c.components().migrations.register_task(task.clone()).unwrap();

    let err = c.enable_feature("f", Some("u1")).await.unwrap_err();

    assert!(matches!(err, IntegrationError::Flag { .. }));
    assert_eq!(task.executions(), 0);
    assert!(c.migration_history("f").is_empty());
    assert!(c.components().migrations.check_needed("f"));
    assert!(!c.is_feature_enabled("f"));
    assert!(c.integration_status().is_empty());
}

#[tokio::test]
async fn re_registering_refreshes_flag_targeting() {
    let c = coordinator();
    with_features(&c, vec![Feature::new("labs", "Labs").rollout(RolloutStrategy::beta(["qa"]))]).await;
    c.components().flags.enable("labs").await.unwrap();
    assert!(!c.is_feature_enabled_for("labs", &EvaluationContext::for_user("u2")));

    c.register_feature(Feature::new("labs", "Labs")).await.unwrap();

    assert!(c.is_feature_enabled("labs"));
    assert!(c.is_feature_enabled_for("labs", &EvaluationContext::for_user("u2")));
    assert!(c.components().flags.get("labs").unwrap().user_groups.is_empty());
}

#[tokio::test]
async fn overlapping_enables_run_migrations_once() {
    let c = coordinator();
    with_features(&c, vec![Feature::new("f", "F")]).await;
    let task = CountingTask::new("m1", "f", false);
    c.components().migrations.register_task(task.clone()).unwrap();

    let other = c.clone();
    let (first, second) = tokio::join!(c.enable_feature("f", Some("u1")), other.enable_feature("f", Some("u2")));

    assert!(first.unwrap() && second.unwrap());
    assert_eq!(task.executions(), 1);
}

#[tokio::test]
async fn enable_emits_migration_and_lifecycle_events_in_order() {
    let c = coordinator();
    let mut events = c.subscribe();
    with_features(&c, vec![Feature::new("f", "F")]).await;
    c.components().migrations.register_task(CountingTask::new("m1", "f", false)).unwrap();

    c.enable_feature("f", Some("u1")).await.unwrap();
    c.disable_feature("f", Some("u1")).await.unwrap();

    let kinds: Vec<_> = std::iter::from_fn(|| events.try_recv()).map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EventKind::MigrationStarted,
            EventKind::MigrationCompleted,
            EventKind::FeatureEnabled,
            EventKind::FeatureDisabled,
        ]
    );
}

#[tokio::test]
async fn batch_enables_dependencies_first_and_keeps_going() {
    let c = coordinator();
    with_features(&c, chain()).await;

    let ids = vec!["b".to_owned(), "a".to_owned(), "ghost".to_owned()];
    let outcomes = c.enable_features(&ids, None).await;

    let order: Vec<_> = outcomes.iter().map(|o| o.feature.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "ghost"]);
    assert!(outcomes[0].enabled && outcomes[1].enabled);
    assert!(!outcomes[2].enabled);
    assert!(outcomes[2].error.is_some());
    assert!(c.validate_integration().await.valid);
}

#[tokio::test]
async fn export_then_import_preserves_evaluation() {
    let features = || {
        vec![
            Feature::new("x", "X"),
            Feature::new("y", "Y").rollout(RolloutStrategy::beta(["qa"])),
            Feature::new("z", "Z").rollout(RolloutStrategy::gradual(50.0)),
        ]
    };
    let source = coordinator();
    with_features(&source, features()).await;
    source.enable_feature("x", None).await.unwrap();
    let qa = UserAttributes { groups: vec!["qa".into()], ..UserAttributes::default() };
    source.set_user_attributes("u1", &qa).await.unwrap();
    source.enable_feature("y", Some("u1")).await.unwrap();
    source.components().flags.enable("z").await.unwrap();

    let exported = source.export_configuration().unwrap();
    let document: serde_json::Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(document["enabled_features"], serde_json::json!(["x", "y"]));
    assert!(document["timestamp"].is_string());

    let target = coordinator();
    with_features(&target, features()).await;
    let summary = target.import_flags(&exported).await.unwrap();
    assert_eq!(summary.imported, 3);

    let contexts = [
        EvaluationContext::anonymous(),
        EvaluationContext::for_user("u1").with_groups(["qa"]),
        EvaluationContext::for_user("u2"),
        EvaluationContext::for_user("u3").with_device("mobile"),
    ];
    for id in ["x", "y", "z"] {
        for ctx in &contexts {
            assert_eq!(source.is_feature_enabled_for(id, ctx), target.is_feature_enabled_for(id, ctx), "{id}");
        }
    }
    assert!(target.is_feature_enabled("x"));
}

#[tokio::test]
async fn committed_state_survives_a_restart() {
    let store: SharedStore = Arc::new(MemoryStore::new());
    let first = coordinator_on(&store, Environment::default());
    with_features(&first, chain()).await;
    first.enable_feature("a", Some("admin")).await.unwrap();

    let second = coordinator_on(&store, Environment::default());
    let summary = second.load().await.unwrap();
    with_features(&second, chain()).await;

    assert_eq!(summary.states, 1);
    assert_eq!(summary.flags, 2);
    assert!(second.is_feature_enabled("a"));
    assert!(!second.is_feature_enabled("b"));
    assert_eq!(second.integration_status()["a"].user_id.as_deref(), Some("admin"));
}

#[tokio::test]
async fn health_reports_registry_flag_drift() {
    let c = coordinator();
    with_features(&c, chain()).await;
    c.enable_feature("a", None).await.unwrap();
    c.enable_feature("b", None).await.unwrap();
    assert!(c.health_status().await.healthy);

    c.components().registry.set_enabled("a", false).unwrap();
    let health = c.health_status().await;

    assert!(!health.healthy);
    assert_eq!(health.issues, vec!["a is disabled in the registry but its flag is enabled"]);
    assert!(!health.recommendations.is_empty());
}

#[tokio::test]
async fn recommendations_follow_enabled_features_and_device() {
    let env = Environment { device_type: "mobile".into(), ..Environment::default() };
    let c = coordinator_on(&(Arc::new(MemoryStore::new()) as SharedStore), env);
    with_features(
        &c,
        vec![
            Feature::new(ENHANCED_NAVIGATION, "Navigation"),
            Feature::new(KEYBOARD_SHORTCUTS, "Shortcuts"),
            Feature::new(ADVANCED_SEARCH, "Search").depends_on(ENHANCED_NAVIGATION),
            Feature::new(MOBILE_OPTIMIZATION, "Mobile"),
        ],
    )
    .await;

    let before: Vec<_> = c.recommendations(None).await.unwrap().into_iter().map(|r| r.feature).collect();
    assert_eq!(before, vec![MOBILE_OPTIMIZATION]);

    c.enable_feature(ENHANCED_NAVIGATION, None).await.unwrap();
    let after: Vec<_> = c.recommendations(None).await.unwrap().into_iter().map(|r| r.feature).collect();
    assert_eq!(after, vec![KEYBOARD_SHORTCUTS, ADVANCED_SEARCH, MOBILE_OPTIMIZATION]);
}
