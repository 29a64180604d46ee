use crate::context::{MigrationContext, UserSnapshot};
use crate::error::{MigrationError, MigrationErrorExt};
use crate::order::execution_order;
use crate::task::{MigrationTask, TaskSpec};
use fstone_domain::config::MigrationSettings;
use fstone_domain::constants::ANONYMOUS_USER;
use fstone_domain::{Feature, MigrationResult, MigrationState, MigrationStatus};
use fstone_kernel::safe_nanoid;
use fstone_kernel::time::now_millis;
use fstone_storage::{KeyValueStore, NamespacedStore, SharedStore, encode_segment};
use fxhash::{FxHashMap, FxHashSet};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Store namespace holding one status-history array per task.
pub const MIGRATIONS_NAMESPACE: &str = "migrations";

/// Outcome of one [`MigrationOrchestrator::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationRun {
    pub feature: String,
    /// Per-task results in execution order, failures included.
    pub results: Vec<MigrationResult>,
    /// Tasks reverted after a failure, in rollback order.
    pub rolled_back: Vec<String>,
}

impl MigrationRun {
    /// True when every executed task succeeded (vacuously true for a feature without tasks).
    #[must_use]
    pub fn success(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    #[must_use]
    pub fn failures(&self) -> Vec<&MigrationResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }
}

#[derive(Debug, Default)]
struct OrchestratorInner {
    tasks: Vec<Arc<dyn MigrationTask>>,
    history: FxHashMap<String, Vec<MigrationStatus>>,
}

/// Executes the migration tasks tied to a feature.
///
/// Tasks of one feature run strictly sequentially, dependencies first and then by priority.
/// Each attempt leaves a [`MigrationStatus`] trail (`Pending → Running → Completed | Failed`,
/// later `RolledBack`) in a per-task history that is written to `migrations/<task>` and
/// reloaded by [`MigrationOrchestrator::load`]. A failing task never aborts `run` with an error;
/// it shows up as a failed [`MigrationResult`].
#[derive(Debug, Clone)]
pub struct MigrationOrchestrator {
    inner: Arc<RwLock<OrchestratorInner>>,
    store: SharedStore,
    history_store: NamespacedStore,
    settings: MigrationSettings,
}

impl MigrationOrchestrator {
    /// # Errors
    /// Returns [`MigrationError::Storage`] if the history namespace cannot be created.
    pub fn new(store: SharedStore, settings: &MigrationSettings) -> Result<Self, MigrationError> {
        Ok(Self {
            inner: Arc::default(),
            history_store: NamespacedStore::new(Arc::clone(&store), MIGRATIONS_NAMESPACE)?,
            store,
            settings: settings.clone(),
        })
    }

    #[must_use]
    pub const fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// # Errors
    /// Returns [`MigrationError::DuplicateTask`] if a task with the same id is registered.
    pub fn register_task(&self, task: Arc<dyn MigrationTask>) -> Result<(), MigrationError> {
        let mut inner = self.inner.write();
        let id = &task.spec().id;
        if inner.tasks.iter().any(|t| &t.spec().id == id) {
            return Err(MigrationError::DuplicateTask { message: id.clone().into(), context: None });
        }
        debug!(task = %id, feature = %task.spec().feature, "Migration task registered");
        inner.tasks.push(task);
        Ok(())
    }

    /// Task specs of `feature` in execution order.
    #[must_use]
    pub fn tasks_for(&self, feature: &str) -> Vec<TaskSpec> {
        self.ordered_tasks(feature).iter().map(|t| t.spec().clone()).collect()
    }

    #[must_use]
    pub fn requires_migration(&self, feature: &str) -> bool {
        self.inner.read().tasks.iter().any(|t| t.spec().feature == feature)
    }

    #[must_use]
    pub fn features_requiring_migration(&self) -> BTreeSet<String> {
        self.inner.read().tasks.iter().map(|t| t.spec().feature.clone()).collect()
    }

    /// True if some task of `feature` has no `Completed` latest status.
    #[must_use]
    pub fn check_needed(&self, feature: &str) -> bool {
        let inner = self.inner.read();
        inner
            .tasks
            .iter()
            .filter(|t| t.spec().feature == feature)
            .any(|t| latest_state(&inner.history, &t.spec().id) != Some(MigrationState::Completed))
    }

    #[must_use]
    pub fn history(&self, task_id: &str) -> Vec<MigrationStatus> {
        self.inner.read().history.get(task_id).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn latest_status(&self, task_id: &str) -> Option<MigrationStatus> {
        self.inner.read().history.get(task_id).and_then(|h| h.last().cloned())
    }

    /// Statuses of every task of `feature`, oldest first per task.
    #[must_use]
    pub fn feature_history(&self, feature: &str) -> Vec<MigrationStatus> {
        let inner = self.inner.read();
        inner
            .tasks
            .iter()
            .filter(|t| t.spec().feature == feature)
            .filter_map(|t| inner.history.get(&t.spec().id))
            .flatten()
            .cloned()
            .collect()
    }

    /// Aggregate state of a feature's tasks; `None` when it has none.
    ///
    /// `Completed` iff every task's latest status is; otherwise the first of `Failed`,
    /// `RolledBack`, `Running` found, else `Pending`.
    #[must_use]
    pub fn feature_state(&self, feature: &str) -> Option<MigrationState> {
        let inner = self.inner.read();
        let states: Vec<Option<MigrationState>> = inner
            .tasks
            .iter()
            .filter(|t| t.spec().feature == feature)
            .map(|t| latest_state(&inner.history, &t.spec().id))
            .collect();

        if states.is_empty() {
            return None;
        }
        if states.iter().all(|s| *s == Some(MigrationState::Completed)) {
            return Some(MigrationState::Completed);
        }
        [MigrationState::Failed, MigrationState::RolledBack, MigrationState::Running]
            .into_iter()
            .find(|wanted| states.contains(&Some(*wanted)))
            .or(Some(MigrationState::Pending))
    }

    /// [`MigrationOrchestrator::feature_state`] for every feature with tasks.
    #[must_use]
    pub fn states(&self) -> BTreeMap<String, MigrationState> {
        self.features_requiring_migration()
            .into_iter()
            .filter_map(|feature| self.feature_state(&feature).map(|state| (feature, state)))
            .collect()
    }

    /// Runs every task of `feature` for `user_id`.
    ///
    /// On a failure with `rollback_on_error`, tasks completed earlier in this run are rolled
    /// back in reverse order and the remaining tasks are skipped. Without it, the run goes on
    /// and dependents of the failed task fail their dependency check.
    ///
    /// # Errors
    /// Only systemic failures escape: the user snapshot or the status history cannot be read
    /// or written.
    pub async fn run(&self, feature: &Feature, user_id: Option<&str>) -> Result<MigrationRun, MigrationError> {
        let tasks = self.ordered_tasks(&feature.id);
        let mut run = MigrationRun { feature: feature.id.clone(), ..MigrationRun::default() };
        if tasks.is_empty() {
            return Ok(run);
        }

        let user = user_id.unwrap_or(ANONYMOUS_USER);
        let mut ctx = self.context(feature, user_id, false).await?;
        let original = ctx.snapshot.clone();
        let mut completed: Vec<Arc<dyn MigrationTask>> = Vec::new();
        let mut touched: FxHashSet<String> = FxHashSet::default();

        info!(feature = %feature.id, user_id = %user, tasks = tasks.len(), "Migration run started");

        for task in &tasks {
            let spec = task.spec();
            touched.insert(spec.id.clone());
            let mut status = self.begin(spec, user_id);

            let result = match self.unmet_dependency(spec) {
                Some(dependency) => MigrationResult::failure(
                    &spec.id,
                    format!("dependency {dependency} has not completed"),
                ),
                None => {
                    self.advance(&mut status, MigrationState::Running, 10, None);
                    self.attempt(task.as_ref(), &mut ctx).await
                },
            };

            if result.success {
                info!(task = %spec.id, feature = %feature.id, "Migration task completed");
                self.advance(&mut status, MigrationState::Completed, 100, Some(result.clone()));
                completed.push(Arc::clone(task));
                run.results.push(result);
                continue;
            }

            error!(
                task = %spec.id,
                feature = %feature.id,
                error = result.error.as_deref().unwrap_or_default(),
                "Migration task failed"
            );
            let progress = status.progress;
            self.advance(&mut status, MigrationState::Failed, progress, Some(result.clone()));
            run.results.push(result);

            if self.settings.rollback_on_error {
                run.rolled_back = self.rollback_tasks(&completed, &mut ctx, user_id).await;
                break;
            }
        }

        if run.success() {
            ctx.snapshot.set_feature_version(&feature.id, &feature.version);
        }
        if self.settings.snapshot_user_data && ctx.snapshot != original {
            ctx.snapshot.save(&self.store, user).await?;
        }
        self.persist(touched.iter()).await?;

        info!(
            feature = %feature.id,
            succeeded = run.results.iter().filter(|r| r.success).count(),
            failed = run.failures().len(),
            rolled_back = run.rolled_back.len(),
            "Migration run finished"
        );
        Ok(run)
    }

    /// Rehearses `feature`'s tasks: `validate` and `execute` run against a private copy of
    /// the snapshot with `dry_run` set. No status is recorded and nothing is written.
    ///
    /// # Errors
    /// Returns an error if the user snapshot cannot be read.
    pub async fn dry_run(
        &self,
        feature: &Feature,
        user_id: Option<&str>,
    ) -> Result<Vec<MigrationResult>, MigrationError> {
        let mut ctx = self.context(feature, user_id, true).await?;
        let mut rehearsed: FxHashSet<String> = FxHashSet::default();
        let mut results = Vec::new();

        for task in self.ordered_tasks(&feature.id) {
            let spec = task.spec();
            let blocked = spec.dependencies.iter().find(|d| {
                !rehearsed.contains(d.as_str()) && self.latest_state(d) != Some(MigrationState::Completed)
            });

            let result = match blocked {
                Some(dependency) => MigrationResult::failure(
                    &spec.id,
                    format!("dependency {dependency} has not completed"),
                ),
                None => self.attempt(task.as_ref(), &mut ctx).await,
            };
            if result.success {
                rehearsed.insert(spec.id.clone());
            }
            results.push(result);
        }

        debug!(feature = %feature.id, tasks = results.len(), "Migration dry run finished");
        Ok(results)
    }

    /// Rolls back every `Completed`, rollback-capable task of `feature` in reverse execution
    /// order and persists the snapshot. Returns the rolled back task ids.
    ///
    /// # Errors
    /// Returns an error if the snapshot or history cannot be read or written.
    pub async fn rollback_feature(
        &self,
        feature: &Feature,
        user_id: Option<&str>,
    ) -> Result<Vec<String>, MigrationError> {
        let completed: Vec<_> = self
            .ordered_tasks(&feature.id)
            .into_iter()
            .filter(|t| self.latest_state(&t.spec().id) == Some(MigrationState::Completed))
            .collect();
        if completed.is_empty() {
            return Ok(Vec::new());
        }

        let user = user_id.unwrap_or(ANONYMOUS_USER);
        let mut ctx = self.context(feature, user_id, false).await?;
        let rolled_back = self.rollback_tasks(&completed, &mut ctx, user_id).await;

        if self.settings.snapshot_user_data {
            ctx.snapshot.save(&self.store, user).await?;
        }
        self.persist(rolled_back.iter()).await?;
        info!(feature = %feature.id, rolled_back = rolled_back.len(), "Feature migrations rolled back");
        Ok(rolled_back)
    }

    /// Reloads every persisted status history. Returns the number of task histories read;
    /// unreadable entries are skipped with a warning.
    ///
    /// # Errors
    /// Returns [`MigrationError::Storage`] if the store cannot be listed or read.
    pub async fn load(&self) -> Result<usize, MigrationError> {
        let mut loaded = 0;
        for key in self.history_store.keys("").await? {
            let Some(raw) = self.history_store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<Vec<MigrationStatus>>(&raw) {
                Ok(history) => {
                    if let Some(task_id) = history.first().map(|s| s.task_id.clone()) {
                        self.inner.write().history.insert(task_id, history);
                        loaded += 1;
                    }
                },
                Err(err) => warn!(key = %key, error = %err, "Skipping unreadable migration history"),
            }
        }
        debug!(loaded, "Migration history loaded");
        Ok(loaded)
    }

    fn ordered_tasks(&self, feature: &str) -> Vec<Arc<dyn MigrationTask>> {
        let tasks: Vec<_> = self
            .inner
            .read()
            .tasks
            .iter()
            .filter(|t| t.spec().feature == feature)
            .cloned()
            .collect();
        execution_order(&tasks)
    }

    fn latest_state(&self, task_id: &str) -> Option<MigrationState> {
        latest_state(&self.inner.read().history, task_id)
    }

    fn unmet_dependency<'a>(&self, spec: &'a TaskSpec) -> Option<&'a String> {
        spec.dependencies.iter().find(|d| self.latest_state(d) != Some(MigrationState::Completed))
    }

    async fn context(
        &self,
        feature: &Feature,
        user_id: Option<&str>,
        dry_run: bool,
    ) -> Result<MigrationContext, MigrationError> {
        let mut ctx = MigrationContext::new(&feature.id, &feature.version);
        ctx.user_id = user_id.map(ToOwned::to_owned);
        ctx.dry_run = dry_run;
        if self.settings.snapshot_user_data {
            let snapshot = UserSnapshot::load(&self.store, ctx.user()).await?;
            ctx = ctx.with_snapshot(snapshot);
        }
        Ok(ctx)
    }

    /// Validates, then executes with up to `retry_attempts` extra tries. The snapshot is
    /// restored after every failed try.
    async fn attempt(&self, task: &dyn MigrationTask, ctx: &mut MigrationContext) -> MigrationResult {
        let id = &task.spec().id;
        match task.validate(ctx).await {
            Ok(true) => {},
            Ok(false) => return MigrationResult::failure(id, "validation rejected the current data"),
            Err(err) => return MigrationResult::failure(id, err.to_string()),
        }

        let attempts = self.settings.retry_attempts.saturating_add(1);
        let mut last = MigrationResult::failure(id, "task was not executed");
        for attempt in 1..=attempts {
            let before = ctx.snapshot.clone();
            last = match task.execute(ctx).await {
                Ok(result) if result.success => return result,
                Ok(result) => result,
                Err(err) => MigrationResult::failure(id, err.to_string()),
            };
            ctx.snapshot = before;
            if attempt < attempts {
                warn!(task = %id, attempt, "Migration task failed; retrying");
            }
        }
        last
    }

    async fn rollback_tasks(
        &self,
        completed: &[Arc<dyn MigrationTask>],
        ctx: &mut MigrationContext,
        user_id: Option<&str>,
    ) -> Vec<String> {
        let mut rolled_back = Vec::new();
        for task in completed.iter().rev() {
            let spec = task.spec();
            if !spec.rollback_supported {
                debug!(task = %spec.id, "Task is not reversible; skipping rollback");
                continue;
            }

            let before = ctx.snapshot.clone();
            let outcome = match task.rollback(ctx).await {
                Ok(result) if result.success => Ok(result),
                Ok(result) => Err(result.error.unwrap_or(result.message)),
                Err(err) => Err(err.to_string()),
            };

            match outcome {
                Ok(result) => {
                    let mut status = self.begin(spec, user_id);
                    self.advance(&mut status, MigrationState::RolledBack, 0, Some(result));
                    info!(task = %spec.id, "Migration task rolled back");
                    rolled_back.push(spec.id.clone());
                },
                Err(reason) => {
                    ctx.snapshot = before;
                    error!(task = %spec.id, error = %reason, "Rollback failed");
                },
            }
        }
        rolled_back
    }

    fn begin(&self, spec: &TaskSpec, user_id: Option<&str>) -> MigrationStatus {
        let status = MigrationStatus {
            id: safe_nanoid!(),
            task_id: spec.id.clone(),
            feature: spec.feature.clone(),
            state: MigrationState::Pending,
            progress: 0,
            user_id: user_id.map(ToOwned::to_owned),
            started_at: None,
            completed_at: None,
            result: None,
        };
        self.inner.write().history.entry(spec.id.clone()).or_default().push(status.clone());
        status
    }

    /// Moves `status` to `state` and mirrors it into the history entry with the same id.
    fn advance(
        &self,
        status: &mut MigrationStatus,
        state: MigrationState,
        progress: u8,
        result: Option<MigrationResult>,
    ) {
        let now = now_millis();
        status.state = state;
        status.progress = progress;
        match state {
            MigrationState::Running => status.started_at = Some(now),
            MigrationState::Completed | MigrationState::Failed | MigrationState::RolledBack => {
                status.started_at.get_or_insert(now);
                status.completed_at = Some(now);
            },
            MigrationState::Pending => {},
        }
        if result.is_some() {
            status.result = result;
        }

        let mut inner = self.inner.write();
        if let Some(entry) =
            inner.history.get_mut(&status.task_id).and_then(|h| h.iter_mut().rev().find(|s| s.id == status.id))
        {
            *entry = status.clone();
        }
    }

    async fn persist<'a>(&self, task_ids: impl Iterator<Item = &'a String>) -> Result<(), MigrationError> {
        for task_id in task_ids {
            let json = {
                let inner = self.inner.read();
                let history = inner.history.get(task_id).map(Vec::as_slice).unwrap_or_default();
                serde_json::to_string(history)?
            };
            self.history_store
                .set(&encode_segment(task_id), &json)
                .await
                .context("persist migration history")?;
        }
        Ok(())
    }
}

fn latest_state(history: &FxHashMap<String, Vec<MigrationStatus>>, task_id: &str) -> Option<MigrationState> {
    history.get(task_id).and_then(|h| h.last()).map(|s| s.state)
}
