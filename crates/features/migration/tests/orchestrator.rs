use async_trait::async_trait;
use fstone_domain::config::MigrationSettings;
use fstone_domain::{Feature, MigrationPriority, MigrationResult, MigrationState};
use fstone_migration::{MigrationContext, MigrationError, MigrationOrchestrator, MigrationTask, TaskSpec, catalog};
use fstone_storage::{KeyValueStore, MemoryStore, SharedStore};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts its calls, bumps `data[<id>]` on every execution and fails a scripted number of times.
#[derive(Debug)]
struct Scripted {
    spec: TaskSpec,
    failures: AtomicUsize,
    executions: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl Scripted {
    fn new(spec: TaskSpec, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            spec,
            failures: AtomicUsize::new(failures),
            executions: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
        })
    }

    fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MigrationTask for Scripted {
    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    async fn execute(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        let runs = ctx.snapshot.data.get(&self.spec.id).and_then(Value::as_u64).unwrap_or(0);
        ctx.snapshot.data.insert(self.spec.id.clone(), json!(runs + 1));

        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(MigrationError::task_failed("boom"));
        }
        Ok(MigrationResult::success(&self.spec.id, "ok"))
    }

    async fn rollback(&self, ctx: &mut MigrationContext) -> Result<MigrationResult, MigrationError> {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        ctx.snapshot.data.remove(&self.spec.id);
        Ok(MigrationResult::success(&self.spec.id, "reverted"))
    }
}

fn store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

fn feature() -> Feature {
    Feature::new("f", "F").version("2.0.0")
}

fn orchestrator(store: &SharedStore, settings: &MigrationSettings) -> MigrationOrchestrator {
    MigrationOrchestrator::new(Arc::clone(store), settings).unwrap()
}

async fn user_data(store: &SharedStore) -> Value {
    serde_json::from_str(&store.get("users/u1/data").await.unwrap().unwrap_or_else(|| "{}".to_owned())).unwrap()
}

#[tokio::test]
async fn dependencies_run_before_higher_priority_dependents() {
    let store = store();
    let orch = orchestrator(&store, &MigrationSettings::default());
    let m2 = Scripted::new(TaskSpec::new("m2", "f").priority(MigrationPriority::Critical).after("m1"), 0);
    let m1 = Scripted::new(TaskSpec::new("m1", "f").priority(MigrationPriority::Low), 0);
    orch.register_task(m2).unwrap();
    orch.register_task(m1).unwrap();

    let order: Vec<_> = orch.tasks_for("f").into_iter().map(|t| t.id).collect();
    assert_eq!(order, vec!["m1", "m2"]);

    let run = orch.run(&feature(), Some("u1")).await.unwrap();
    assert!(run.success());
    let executed: Vec<_> = run.results.iter().map(|r| r.task_id.as_str()).collect();
    assert_eq!(executed, vec!["m1", "m2"]);

    let states: Vec<_> = orch.history("m1").iter().map(|s| s.state).collect();
    assert_eq!(states, vec![MigrationState::Completed]);
    assert_eq!(orch.feature_state("f"), Some(MigrationState::Completed));
    assert!(!orch.check_needed("f"));

    let data = user_data(&store).await;
    assert_eq!(data["feature_versions"]["f"], "2.0.0");
    assert_eq!(data["m1"], 1);
}

#[tokio::test]
async fn failure_rolls_back_completed_tasks_once() {
    let store = store();
    let orch = orchestrator(&store, &MigrationSettings::default());
    let m1 = Scripted::new(TaskSpec::new("m1", "f").priority(MigrationPriority::High).reversible(), 0);
    let m2 = Scripted::new(TaskSpec::new("m2", "f").reversible(), usize::MAX);
    let m3 = Scripted::new(TaskSpec::new("m3", "f").priority(MigrationPriority::Low), 0);
    orch.register_task(m1.clone()).unwrap();
    orch.register_task(m2.clone()).unwrap();
    orch.register_task(m3.clone()).unwrap();

    let run = orch.run(&feature(), Some("u1")).await.unwrap();

    assert!(!run.success());
    assert_eq!(run.rolled_back, vec!["m1"]);
    assert_eq!(m1.rollbacks(), 1);
    assert_eq!(m2.rollbacks(), 0);
    assert_eq!(m3.executions(), 0, "tasks after the failure are skipped");

    assert_eq!(orch.latest_status("m1").unwrap().state, MigrationState::RolledBack);
    let m2_status = orch.latest_status("m2").unwrap();
    assert_eq!(m2_status.state, MigrationState::Failed);
    assert!(m2_status.result.unwrap().error.unwrap().contains("boom"));
    assert_eq!(orch.feature_state("f"), Some(MigrationState::Failed));
    assert!(orch.check_needed("f"));

    let data = user_data(&store).await;
    assert!(data.get("feature_versions").is_none());
    assert!(data.get("m1").is_none());
}

#[tokio::test]
async fn retries_restore_the_snapshot_between_attempts() {
    let store = store();
    let settings = MigrationSettings { retry_attempts: 2, ..MigrationSettings::default() };
    let orch = orchestrator(&store, &settings);
    let flaky = Scripted::new(TaskSpec::new("flaky", "f"), 2);
    orch.register_task(flaky.clone()).unwrap();

    let run = orch.run(&feature(), Some("u1")).await.unwrap();

    assert!(run.success());
    assert_eq!(flaky.executions(), 3);
    assert_eq!(user_data(&store).await["flaky"], 1);
}

#[tokio::test]
async fn without_rollback_dependents_fail_their_dependency_check() {
    let store = store();
    let settings = MigrationSettings { rollback_on_error: false, ..MigrationSettings::default() };
    let orch = orchestrator(&store, &settings);
    let m1 = Scripted::new(TaskSpec::new("m1", "f").reversible(), usize::MAX);
    let m2 = Scripted::new(TaskSpec::new("m2", "f").after("m1"), 0);
    let other = Scripted::new(TaskSpec::new("other", "f").priority(MigrationPriority::Low), 0);
    orch.register_task(m1.clone()).unwrap();
    orch.register_task(m2.clone()).unwrap();
    orch.register_task(other.clone()).unwrap();

    let run = orch.run(&feature(), Some("u1")).await.unwrap();

    assert!(run.rolled_back.is_empty());
    assert_eq!(run.failures().len(), 2);
    assert_eq!(m2.executions(), 0);
    assert_eq!(other.executions(), 1);
    let m2_result = run.results.iter().find(|r| r.task_id == "m2").unwrap();
    assert_eq!(m2_result.error.as_deref(), Some("dependency m1 has not completed"));
}

#[tokio::test]
async fn dry_run_records_and_writes_nothing() {
    let store = store();
    store.set("users/u1/preferences", r#"{"theme":"light"}"#).await.unwrap();
    let orch = orchestrator(&store, &MigrationSettings::default());
    for task in catalog::builtin_tasks() {
        orch.register_task(task).unwrap();
    }
    let dark_mode = Feature::new("dark_mode", "Dark mode");

    let results = orch.dry_run(&dark_mode, Some("u1")).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].success);
    assert!(orch.history(catalog::DARK_MODE_COLOR_SCHEME).is_empty());
    assert_eq!(store.get("users/u1/preferences").await.unwrap().as_deref(), Some(r#"{"theme":"light"}"#));
    assert!(store.keys("migrations").await.unwrap().is_empty());
}

#[tokio::test]
async fn dry_run_chains_dependencies_within_the_rehearsal() {
    let store = store();
    store.set("users/u1/customizations", r#"{"dashboard":["weather","news"]}"#).await.unwrap();
    let orch = orchestrator(&store, &MigrationSettings::default());
    for task in catalog::builtin_tasks() {
        orch.register_task(task).unwrap();
    }

    let results = orch.dry_run(&Feature::new("personalized_dashboard", "Dashboard"), Some("u1")).await.unwrap();

    assert!(results.iter().all(|r| r.success), "{results:?}");
    assert_eq!(results[0].task_id, catalog::DASHBOARD_LAYOUT_V2);
}

#[tokio::test]
async fn builtin_migration_persists_the_user_snapshot() {
    let store = store();
    store.set("users/u1/preferences", r#"{"theme":"dark"}"#).await.unwrap();
    let orch = orchestrator(&store, &MigrationSettings::default());
    for task in catalog::builtin_tasks() {
        orch.register_task(task).unwrap();
    }
    let dark_mode = Feature::new("dark_mode", "Dark mode").version("1.2.0");

    assert!(orch.run(&dark_mode, Some("u1")).await.unwrap().success());

    let prefs: Value = serde_json::from_str(&store.get("users/u1/preferences").await.unwrap().unwrap()).unwrap();
    assert_eq!(prefs, json!({ "color_scheme": "dark", "legacy_theme": "dark" }));
    assert_eq!(user_data(&store).await["feature_versions"]["dark_mode"], "1.2.0");

    let rolled_back = orch.rollback_feature(&dark_mode, Some("u1")).await.unwrap();
    assert_eq!(rolled_back, vec![catalog::DARK_MODE_COLOR_SCHEME]);
    let prefs: Value = serde_json::from_str(&store.get("users/u1/preferences").await.unwrap().unwrap()).unwrap();
    assert_eq!(prefs, json!({ "theme": "dark" }));
    assert_eq!(orch.feature_state("dark_mode"), Some(MigrationState::RolledBack));
}

#[tokio::test]
async fn history_survives_a_restart() {
    let store = store();
    let orch = orchestrator(&store, &MigrationSettings::default());
    orch.register_task(Scripted::new(TaskSpec::new("m1", "f"), 0)).unwrap();
    orch.run(&feature(), None).await.unwrap();

    let restarted = orchestrator(&store, &MigrationSettings::default());
    restarted.register_task(Scripted::new(TaskSpec::new("m1", "f"), 0)).unwrap();
    assert!(restarted.check_needed("f"));

    assert_eq!(restarted.load().await.unwrap(), 1);
    assert_eq!(restarted.latest_status("m1").unwrap().state, MigrationState::Completed);
    assert!(!restarted.check_needed("f"));
}

#[tokio::test]
async fn duplicate_tasks_are_rejected() {
    let orch = orchestrator(&store(), &MigrationSettings::default());
    orch.register_task(Scripted::new(TaskSpec::new("m1", "f"), 0)).unwrap();
    let err = orch.register_task(Scripted::new(TaskSpec::new("m1", "g"), 0)).unwrap_err();
    assert!(matches!(err, MigrationError::DuplicateTask { .. }));
    assert!(!orch.requires_migration("g"));
    assert!(orch.check_needed("f"));
    assert!(!orch.check_needed("unknown"));
}
