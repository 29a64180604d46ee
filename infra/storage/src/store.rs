use crate::error::StorageError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// The injected persistence collaborator: a flat key → string map.
///
/// Implementations must give read-your-write consistency within one process.
/// Keys are validated with [`crate::validate_key`] by every implementation.
#[async_trait]
pub trait KeyValueStore: Debug + Send + Sync {
    /// Returns the value stored under `key`, or `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Returns whether a value was present.
    async fn delete(&self, key: &str) -> Result<bool, StorageError>;

    /// Lists every key starting with `prefix`, sorted.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Like [`KeyValueStore::get`] but treats absence as an error.
    async fn require(&self, key: &str) -> Result<String, StorageError> {
        self.get(key).await?.ok_or_else(|| StorageError::KeyNotFound {
            message: key.to_owned().into(),
            context: None,
        })
    }
}

/// Shared handle to a store, as injected into the engine components.
pub type SharedStore = Arc<dyn KeyValueStore>;
