use crate::error::StorageError;
use crate::key::{SEPARATOR, validate_key, validate_prefix};
use crate::store::{KeyValueStore, SharedStore};
use async_trait::async_trait;
use std::sync::Arc;

/// A scoped view of a store: every key is prefixed with a validated namespace.
///
/// Namespaces may span several segments (`users/u1`) and can be nested with
/// [`NamespacedStore::namespace`]. Keys returned by `keys` are relative to the namespace.
#[derive(Debug, Clone)]
pub struct NamespacedStore {
    store: SharedStore,
    namespace: Arc<str>,
}

impl NamespacedStore {
    /// # Errors
    /// Returns [`StorageError::InvalidKey`] if `namespace` is not a valid key.
    pub fn new(store: SharedStore, namespace: &str) -> Result<Self, StorageError> {
        validate_key(namespace)?;
        Ok(Self { store, namespace: Arc::from(namespace) })
    }

    /// A nested namespace below this one.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidKey`] if `child` is not a valid key.
    pub fn namespace(&self, child: &str) -> Result<Self, StorageError> {
        validate_key(child)?;
        Ok(Self {
            store: Arc::clone(&self.store),
            namespace: Arc::from(format!("{}{SEPARATOR}{child}", self.namespace)),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, key: &str) -> Result<String, StorageError> {
        validate_key(key)?;
        Ok(format!("{}{SEPARATOR}{key}", self.namespace))
    }
}

#[async_trait]
impl KeyValueStore for NamespacedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.store.get(&self.scoped(key)?).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.store.set(&self.scoped(key)?, value).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        self.store.delete(&self.scoped(key)?).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;
        let base = format!("{}{SEPARATOR}", self.namespace);
        let full = format!("{base}{prefix}");
        Ok(self
            .store
            .keys(&full)
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&base).map(str::to_owned))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let backing = MemoryStore::new();
        let shared: SharedStore = Arc::new(backing.clone());
        let u1 = NamespacedStore::new(Arc::clone(&shared), "users/u1").unwrap();
        let u2 = NamespacedStore::new(shared, "users/u2").unwrap();

        u1.set("preferences", "{\"theme\":\"dark\"}").await.unwrap();
        assert!(u2.get("preferences").await.unwrap().is_none());
        assert_eq!(
            backing.get("users/u1/preferences").await.unwrap().as_deref(),
            Some("{\"theme\":\"dark\"}")
        );
        assert_eq!(u1.keys("").await.unwrap(), vec!["preferences"]);
    }

    #[tokio::test]
    async fn nested_namespaces_compose() {
        let backing = MemoryStore::new();
        let users = NamespacedStore::new(Arc::new(backing.clone()), "users").unwrap();
        let alice = users.namespace("alice").unwrap();
        assert_eq!(alice.name(), "users/alice");

        alice.set("data", "{}").await.unwrap();
        assert_eq!(users.keys("alice/").await.unwrap(), vec!["alice/data"]);
        assert!(alice.delete("data").await.unwrap());
        assert!(backing.is_empty());
    }

    #[tokio::test]
    async fn invalid_namespace_is_rejected() {
        let shared: SharedStore = Arc::new(MemoryStore::new());
        assert!(NamespacedStore::new(Arc::clone(&shared), "../escape").is_err());
        let ns = NamespacedStore::new(shared, "flags").unwrap();
        assert!(ns.namespace("").is_err());
        assert!(ns.get("/x").await.is_err());
    }
}
