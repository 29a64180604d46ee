use crate::bucket::{bucket, within_percentage};
use crate::decision::{DecisionReason, FlagDecision};
use crate::definition::{FlagDefinition, FlagOptions};
use crate::error::{FlagError, FlagErrorExt};
use fstone_domain::AttributeValue;
use fstone_domain::EvaluationContext;
use fstone_domain::config::FlagSettings;
use fstone_kernel::time::{minute_bucket, now_millis, to_rfc3339};
use fstone_storage::{KeyValueStore, NamespacedStore, SharedStore, encode_segment};
use fxhash::{FxHashMap, FxHasher};
use moka::sync::Cache;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Store namespace holding one JSON definition per flag.
pub const FLAGS_NAMESPACE: &str = "flags";

type CacheKey = (String, u64);

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

/// Outcome of [`FlagEvaluator::import_flags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

#[derive(Serialize)]
struct FlagExport {
    flags: BTreeMap<String, FlagDefinition>,
    exported_at: String,
}

/// Decides per evaluation context whether a flag is active.
///
/// Definitions live in memory behind a lock and are written through to the injected store.
/// Boolean results are cached per `(flag, context fingerprint)` for the configured TTL; any
/// change to a definition drops that flag's entries. Clones share definitions and cache.
#[derive(Debug, Clone)]
pub struct FlagEvaluator {
    flags: Arc<RwLock<FxHashMap<String, FlagDefinition>>>,
    cache: Cache<CacheKey, bool>,
    counters: Arc<Counters>,
    store: NamespacedStore,
}

impl FlagEvaluator {
    /// # Errors
    /// Returns [`FlagError::Storage`] if the flag namespace cannot be created.
    pub fn new(store: SharedStore, settings: &FlagSettings) -> Result<Self, FlagError> {
        let cache = Cache::builder()
            .max_capacity(settings.cache_capacity)
            .time_to_live(Duration::from_secs(settings.cache_ttl_seconds))
            .build();

        Ok(Self {
            flags: Arc::default(),
            cache,
            counters: Arc::default(),
            store: NamespacedStore::new(store, FLAGS_NAMESPACE)?,
        })
    }

    /// Registers (or replaces) a flag and persists it.
    ///
    /// # Errors
    /// Returns a validation error for a malformed definition, or a storage/serialization
    /// error if the definition cannot be persisted.
    pub async fn register(
        &self,
        id: &str,
        enabled: bool,
        options: FlagOptions,
    ) -> Result<FlagDefinition, FlagError> {
        let mut definition = FlagDefinition::new(id, enabled, options);
        definition.updated_at = now_millis();
        definition.validate()?;

        self.install(definition.clone());
        self.persist(&definition).await?;
        info!(flag = %id, enabled, "Flag registered");
        Ok(definition)
    }

    /// Registers the flag unless a definition already exists (e.g. one reloaded from the store).
    /// Returns whether a new definition was created.
    ///
    /// # Errors
    /// See [`FlagEvaluator::register`].
    pub async fn ensure_registered(&self, id: &str, options: FlagOptions) -> Result<bool, FlagError> {
        if self.contains(id) {
            return Ok(false);
        }
        self.register(id, false, options).await?;
        Ok(true)
    }

    /// Replaces the percentage and groups of an existing flag with those of `options`, keeping
    /// its switch and conditions. Returns whether the targeting changed.
    ///
    /// # Errors
    /// [`FlagError::UnknownFlag`] if `id` is not registered, a validation error if the new
    /// targeting is malformed (the flag is left untouched), storage errors from persisting.
    pub async fn retarget(&self, id: &str, options: &FlagOptions) -> Result<bool, FlagError> {
        let definition = {
            let mut flags = self.flags.write();
            let current = flags.get_mut(id).ok_or_else(|| FlagError::unknown(id))?;
            if current.rollout_percentage == options.rollout_percentage
                && current.user_groups == options.user_groups
            {
                return Ok(false);
            }

            let mut next = current.clone();
            next.rollout_percentage = options.rollout_percentage;
            next.user_groups.clone_from(&options.user_groups);
            next.validate()?;
            next.updated_at = now_millis();
            *current = next.clone();
            self.invalidate(id);
            next
        };

        self.persist(&definition).await?;
        info!(flag = %id, percentage = ?definition.rollout_percentage, groups = ?definition.user_groups, "Flag retargeted");
        Ok(true)
    }

    /// # Errors
    /// [`FlagError::UnknownFlag`] if `id` is not registered; storage errors from persisting.
    pub async fn enable(&self, id: &str) -> Result<(), FlagError> {
        self.set_enabled(id, true).await
    }

    /// # Errors
    /// [`FlagError::UnknownFlag`] if `id` is not registered; storage errors from persisting.
    pub async fn disable(&self, id: &str) -> Result<(), FlagError> {
        self.set_enabled(id, false).await
    }

    /// # Errors
    /// [`FlagError::UnknownFlag`] if `id` is not registered; storage errors from persisting.
    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), FlagError> {
        let definition = {
            let mut flags = self.flags.write();
            let definition = flags.get_mut(id).ok_or_else(|| FlagError::unknown(id))?;
            definition.enabled = enabled;
            definition.updated_at = now_millis();
            let snapshot = definition.clone();
            self.invalidate(id);
            snapshot
        };

        self.persist(&definition).await?;
        info!(flag = %id, enabled, "Flag state changed");
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.flags.read().contains_key(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<FlagDefinition> {
        self.flags.read().get(id).cloned()
    }

    /// The stored switch of a flag, ignoring targeting.
    #[must_use]
    pub fn is_committed(&self, id: &str) -> bool {
        self.flags.read().get(id).is_some_and(|f| f.enabled)
    }

    /// Every definition, ordered by id.
    #[must_use]
    pub fn flags(&self) -> Vec<FlagDefinition> {
        self.snapshot().into_values().collect()
    }

    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, FlagDefinition> {
        self.flags.read().iter().map(|(id, def)| (id.clone(), def.clone())).collect()
    }

    /// Cached boolean evaluation. Unknown flags are off.
    #[must_use]
    pub fn is_enabled(&self, id: &str, ctx: &EvaluationContext) -> bool {
        let flags = self.flags.read();
        let Some(definition) = flags.get(id) else {
            return false;
        };

        let time_based = definition.is_time_based();
        let now = if time_based { now_millis() } else { 0 };
        let key = (id.to_owned(), fingerprint(ctx, time_based.then_some(now)));

        if let Some(hit) = self.cache.get(&key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            trace!(flag = %id, "Flag cache hit");
            return hit;
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let enabled = decide(definition, ctx, now).enabled;
        self.cache.insert(key, enabled);
        enabled
    }

    /// Uncached evaluation that reports which step decided.
    #[must_use]
    pub fn evaluate(&self, id: &str, ctx: &EvaluationContext) -> FlagDecision {
        let flags = self.flags.read();
        let Some(definition) = flags.get(id) else {
            return FlagDecision::off(DecisionReason::UnknownFlag);
        };
        let now = if definition.is_time_based() { now_millis() } else { 0 };
        decide(definition, ctx, now)
    }

    /// Reloads every persisted definition, replacing in-memory state for the ids found.
    /// Unreadable entries are skipped with a warning. Returns the number loaded.
    ///
    /// # Errors
    /// Returns [`FlagError::Storage`] if the store cannot be listed or read.
    pub async fn load(&self) -> Result<usize, FlagError> {
        let mut loaded = 0;
        for key in self.store.keys("").await? {
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<FlagDefinition>(&raw) {
                Ok(definition) if definition.validate().is_ok() => {
                    self.install(definition);
                    loaded += 1;
                },
                Ok(_) => warn!(key = %key, "Skipping invalid stored flag definition"),
                Err(err) => warn!(key = %key, error = %err, "Skipping unreadable stored flag"),
            }
        }
        debug!(loaded, "Flags loaded from store");
        Ok(loaded)
    }

    /// Exports every definition as a JSON document `{ "flags": { <id>: {..} }, "exported_at" }`.
    ///
    /// # Errors
    /// Returns [`FlagError::Serialize`] if serialization fails.
    pub fn export_flags(&self) -> Result<String, FlagError> {
        let export = FlagExport { flags: self.snapshot(), exported_at: to_rfc3339(now_millis()) };
        serde_json::to_string_pretty(&export).context("export flags")
    }

    /// Imports flag definitions from JSON.
    ///
    /// Accepts the [`FlagEvaluator::export_flags`] document, a full configuration export
    /// (anything with a `flags` member), a bare `{ <id>: definition }` map, or an array of
    /// definitions. Missing fields take their defaults, unknown fields are ignored and a bare
    /// boolean stands for `{ "enabled": <bool> }`. Entries that still fail validation are
    /// skipped and counted.
    ///
    /// # Errors
    /// Returns [`FlagError::Serialize`] if `json` is not JSON, [`FlagError::Internal`] if it
    /// holds no flag collection, or a storage error while persisting.
    pub async fn import_flags(&self, json: &str) -> Result<ImportSummary, FlagError> {
        let root = serde_json::from_str::<Value>(json).context("import document")?;
        let section = root.get("flags").unwrap_or(&root);

        let entries: Vec<(Option<&str>, &Value)> = match section {
            Value::Object(map) => map.iter().map(|(id, v)| (Some(id.as_str()), v)).collect(),
            Value::Array(items) => items.iter().map(|v| (None, v)).collect(),
            _ => return Err(FlagError::from("import document holds no flag object or array")),
        };

        let mut summary = ImportSummary::default();
        for (key, value) in entries {
            let Some(definition) = parse_entry(key, value) else {
                summary.skipped += 1;
                continue;
            };
            self.install(definition.clone());
            self.persist(&definition).await?;
            summary.imported += 1;
        }

        info!(imported = summary.imported, skipped = summary.skipped, "Flags imported");
        Ok(summary)
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            entries: self.cache.entry_count(),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
    }

    fn install(&self, definition: FlagDefinition) {
        let mut flags = self.flags.write();
        let id = definition.id.clone();
        flags.insert(id.clone(), definition);
        self.invalidate(&id);
    }

    /// Drops every cached result of one flag.
    fn invalidate(&self, id: &str) {
        let stale: Vec<Arc<CacheKey>> =
            self.cache.iter().filter(|(key, _)| key.0 == id).map(|(key, _)| key).collect();
        for key in stale {
            self.cache.invalidate(key.as_ref());
        }
        trace!(flag = %id, "Flag cache invalidated");
    }

    async fn persist(&self, definition: &FlagDefinition) -> Result<(), FlagError> {
        let json = serde_json::to_string(definition)?;
        self.store
            .set(&encode_segment(&definition.id), &json)
            .await
            .context("persist flag definition")
    }
}

fn parse_entry(key: Option<&str>, value: &Value) -> Option<FlagDefinition> {
    let parsed = match value {
        Value::Bool(enabled) => Ok(FlagDefinition { enabled: *enabled, ..FlagDefinition::default() }),
        other => FlagDefinition::deserialize(other),
    };

    let mut definition = match parsed {
        Ok(definition) => definition,
        Err(err) => {
            warn!(flag = key.unwrap_or("?"), error = %err, "Skipping unreadable flag");
            return None;
        },
    };

    if definition.id.is_empty()
        && let Some(key) = key
    {
        key.clone_into(&mut definition.id);
    }

    if let Err(err) = definition.validate() {
        warn!(flag = %definition.id, error = %err, "Skipping invalid flag");
        return None;
    }
    Some(definition)
}

/// Steps in order, stopping at the first that rejects.
fn decide(definition: &FlagDefinition, ctx: &EvaluationContext, now: i64) -> FlagDecision {
    if !definition.enabled {
        return FlagDecision::off(DecisionReason::Disabled);
    }

    if !definition.user_groups.is_empty() && !ctx.user_attributes.in_any_group(&definition.user_groups)
    {
        return FlagDecision::off(DecisionReason::GroupMismatch);
    }

    if let Some(percentage) = definition.rollout_percentage {
        let bucket = bucket(ctx.bucket_key(), &definition.id);
        trace!(flag = %definition.id, bucket, percentage, "Rollout bucket");
        if !within_percentage(bucket, percentage) {
            return FlagDecision::off(DecisionReason::OutsideRollout { bucket });
        }
    }

    if let Some(index) = definition.conditions.iter().position(|c| !c.matches(ctx, now)) {
        return FlagDecision::off(DecisionReason::ConditionFailed { index });
    }

    FlagDecision::on()
}

/// Hash of the context fields a decision can depend on. `minute` is set for time-based flags,
/// so their results are shared within one wall-clock minute at most.
fn fingerprint(ctx: &EvaluationContext, now: Option<i64>) -> u64 {
    let mut hasher = FxHasher::default();
    ctx.bucket_key().hash(&mut hasher);
    ctx.user_attributes.groups.hash(&mut hasher);
    for (name, value) in &ctx.user_attributes.values {
        name.hash(&mut hasher);
        hash_value(value, &mut hasher);
    }
    ctx.device_type.hash(&mut hasher);
    ctx.browser.hash(&mut hasher);
    ctx.location.hash(&mut hasher);
    if let Some(now) = now {
        let at = if ctx.timestamp > 0 { ctx.timestamp } else { now };
        minute_bucket(at).hash(&mut hasher);
    }
    hasher.finish()
}

fn hash_value(value: &AttributeValue, hasher: &mut FxHasher) {
    match value {
        AttributeValue::Bool(b) => (0_u8, *b).hash(hasher),
        AttributeValue::Number(n) => (1_u8, n.to_bits()).hash(hasher),
        AttributeValue::Text(s) => (2_u8, s).hash(hasher),
        AttributeValue::List(items) => (3_u8, items).hash(hasher),
    }
}
