use crate::error::{MigrationError, MigrationErrorExt};
use fstone_domain::constants::ANONYMOUS_USER;
use fstone_storage::{KeyValueStore, SharedStore, encode_segment, join_key};
use serde_json::{Map, Value};

pub(crate) const USERS_NAMESPACE: &str = "users";
const DATA: &str = "data";
const PREFERENCES: &str = "preferences";
const CUSTOMIZATIONS: &str = "customizations";
const FEATURE_VERSIONS: &str = "feature_versions";

/// The per-user documents a migration may transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSnapshot {
    pub data: Map<String, Value>,
    pub preferences: Map<String, Value>,
    pub customizations: Map<String, Value>,
}

impl UserSnapshot {
    /// Reads `users/<user>/{data,preferences,customizations}`; absent or non-object documents
    /// read as empty.
    ///
    /// # Errors
    /// Returns [`MigrationError::Storage`] if the store fails and [`MigrationError::Serialize`]
    /// if a document is not valid JSON.
    pub async fn load(store: &SharedStore, user: &str) -> Result<Self, MigrationError> {
        Ok(Self {
            data: read_document(store, user, DATA).await?,
            preferences: read_document(store, user, PREFERENCES).await?,
            customizations: read_document(store, user, CUSTOMIZATIONS).await?,
        })
    }

    /// Writes the three documents back.
    ///
    /// # Errors
    /// Returns [`MigrationError::Storage`] if the store fails.
    pub async fn save(&self, store: &SharedStore, user: &str) -> Result<(), MigrationError> {
        write_document(store, user, DATA, &self.data).await?;
        write_document(store, user, PREFERENCES, &self.preferences).await?;
        write_document(store, user, CUSTOMIZATIONS, &self.customizations).await
    }

    pub(crate) fn feature_version(&self, feature: &str) -> Option<&str> {
        self.data.get(FEATURE_VERSIONS)?.get(feature)?.as_str()
    }

    pub(crate) fn set_feature_version(&mut self, feature: &str, version: &str) {
        let versions = self
            .data
            .entry(FEATURE_VERSIONS)
            .or_insert_with(|| Value::Object(Map::new()));
        if !versions.is_object() {
            *versions = Value::Object(Map::new());
        }
        if let Value::Object(map) = versions {
            map.insert(feature.to_owned(), Value::String(version.to_owned()));
        }
    }
}

/// Everything a task sees while it runs.
#[derive(Debug, Clone)]
pub struct MigrationContext {
    pub feature: String,
    pub user_id: Option<String>,
    /// Version last migrated to for this user, `"0"` if never.
    pub current_version: String,
    pub target_version: String,
    pub snapshot: UserSnapshot,
    /// Set for rehearsals: nothing the task does is persisted.
    pub dry_run: bool,
}

impl MigrationContext {
    pub fn new(feature: impl Into<String>, target_version: impl Into<String>) -> Self {
        Self {
            feature: feature.into(),
            user_id: None,
            current_version: "0".to_owned(),
            target_version: target_version.into(),
            snapshot: UserSnapshot::default(),
            dry_run: false,
        }
    }

    #[must_use]
    pub fn with_snapshot(mut self, snapshot: UserSnapshot) -> Self {
        if let Some(version) = snapshot.feature_version(&self.feature) {
            version.clone_into(&mut self.current_version);
        }
        self.snapshot = snapshot;
        self
    }

    #[must_use]
    pub fn user(&self) -> &str {
        self.user_id.as_deref().unwrap_or(ANONYMOUS_USER)
    }
}

fn user_key(user: &str, document: &str) -> Result<String, MigrationError> {
    Ok(join_key([USERS_NAMESPACE, encode_segment(user).as_str(), document])?)
}

async fn read_document(
    store: &SharedStore,
    user: &str,
    document: &str,
) -> Result<Map<String, Value>, MigrationError> {
    let Some(raw) = store.get(&user_key(user, document)?).await? else {
        return Ok(Map::new());
    };
    match serde_json::from_str::<Value>(&raw).context("user document")? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

async fn write_document(
    store: &SharedStore,
    user: &str,
    document: &str,
    map: &Map<String, Value>,
) -> Result<(), MigrationError> {
    let json = serde_json::to_string(map)?;
    store.set(&user_key(user, document)?, &json).await.context("user document")
}
