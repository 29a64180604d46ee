use fstone_storage::*;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_traversal_keys_are_rejected() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::builder().root(temp.path()).connect().await.unwrap();

    assert!(matches!(store.resolve("../etc/passwd"), Err(StorageError::InvalidKey { .. })));
    assert!(store.set("flags/../../x", "v").await.is_err());
    assert!(store.get("/etc/passwd").await.is_err());
}

#[tokio::test]
async fn test_set_get_roundtrip_uncompressed() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::builder().root(temp.path()).connect().await.unwrap();

    store.set("flags/dark_mode", r#"{"enabled":true}"#).await.unwrap();
    assert_eq!(store.get("flags/dark_mode").await.unwrap().as_deref(), Some(r#"{"enabled":true}"#));

    let on_disk = std::fs::read_to_string(store.resolve("flags/dark_mode").unwrap()).unwrap();
    assert_eq!(on_disk, r#"{"enabled":true}"#);
}

#[tokio::test]
async fn test_set_get_roundtrip_compressed() {
    let temp = TempDir::new().unwrap();
    let store =
        FileStore::builder().root(temp.path()).compression(Compression::Lz4).connect().await.unwrap();

    let payload = "x".repeat(4096);
    store.set("users/u1/data", &payload).await.unwrap();
    assert_eq!(store.get("users/u1/data").await.unwrap().as_deref(), Some(payload.as_str()));

    let raw = std::fs::read(store.resolve("users/u1/data").unwrap()).unwrap();
    assert!(raw.len() < payload.len(), "value should be stored compressed");
}

#[tokio::test]
async fn test_parent_and_child_keys_coexist() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::builder().root(temp.path()).connect().await.unwrap();

    store.set("users/u1", "parent").await.unwrap();
    store.set("users/u1/preferences", "child").await.unwrap();

    assert_eq!(store.get("users/u1").await.unwrap().as_deref(), Some("parent"));
    assert_eq!(store.keys("users/").await.unwrap(), vec!["users/u1", "users/u1/preferences"]);
}

#[tokio::test]
async fn test_delete_and_prune() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::builder().root(temp.path()).connect().await.unwrap();

    store.set("migrations/theme-migration", "[]").await.unwrap();
    assert!(store.delete("migrations/theme-migration").await.unwrap());
    assert!(!store.delete("migrations/theme-migration").await.unwrap());
    assert!(store.get("migrations/theme-migration").await.unwrap().is_none());
    assert!(!temp.path().join("migrations").exists(), "empty key directories are pruned");
}

#[tokio::test]
async fn test_keys_listing_by_prefix() {
    let temp = TempDir::new().unwrap();
    let store = FileStore::builder().root(temp.path()).connect().await.unwrap();

    for key in ["flags/b", "flags/a", "flagship", "migrations/m1"] {
        store.set(key, "v").await.unwrap();
    }

    assert_eq!(store.keys("flags/").await.unwrap(), vec!["flags/a", "flags/b"]);
    assert_eq!(store.keys("flag").await.unwrap(), vec!["flags/a", "flags/b", "flagship"]);
    assert!(store.keys("missing/").await.unwrap().is_empty());
    assert_eq!(store.keys("").await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_reopen_sees_previous_writes() {
    let temp = TempDir::new().unwrap();
    {
        let store = FileStore::builder().root(temp.path()).connect().await.unwrap();
        store.set("flags/dark_mode", "persisted").await.unwrap();
    }

    let store = FileStore::builder().root(temp.path()).create(false).connect().await.unwrap();
    assert_eq!(store.require("flags/dark_mode").await.unwrap(), "persisted");
}

#[tokio::test]
async fn test_missing_root_without_create_fails() {
    let temp = TempDir::new().unwrap();
    let result = FileStore::builder().root(temp.path().join("absent")).create(false).connect().await;
    assert!(matches!(result, Err(StorageError::Io { .. })));
}

#[tokio::test]
async fn test_namespaced_view_over_file_store() {
    let temp = TempDir::new().unwrap();
    let store: SharedStore =
        Arc::new(FileStore::builder().root(temp.path()).connect().await.unwrap());

    let user = NamespacedStore::new(Arc::clone(&store), "users")
        .unwrap()
        .namespace(&encode_segment("Bob@example.com"))
        .unwrap();
    user.set("attributes", r#"{"groups":["beta"]}"#).await.unwrap();

    assert_eq!(user.keys("").await.unwrap(), vec!["attributes"]);
    assert_eq!(store.keys("users/").await.unwrap(), vec!["users/%42ob%40example.com/attributes"]);
}
