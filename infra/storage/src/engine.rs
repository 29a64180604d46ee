//! File-backed store: one directory per key, holding a single value file.
//!
//! Writes go through a unique temp file, `fsync` and `rename`, so a value is
//! either the old or the new content after a crash, never a torn mix.

use crate::builder::FileStoreBuilder;
use crate::error::{StorageError, StorageErrorExt};
use crate::key::{SEPARATOR, validate_key, validate_prefix};
use crate::maintenance;
use crate::store::KeyValueStore;
use async_trait::async_trait;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use walkdir::WalkDir;

pub(crate) const VALUE_FILE: &str = ".value";
pub(crate) const TMP_MARKER: &str = ".fstmp.";

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum Compression {
    #[default]
    None,
    Lz4,
}

impl Compression {
    #[must_use]
    fn compress(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => data.to_vec(),
            Self::Lz4 => lz4_flex::compress_prepend_size(data),
        }
    }

    fn decompress(self, data: Vec<u8>) -> Result<Vec<u8>, StorageError> {
        match self {
            Self::None => Ok(data),
            Self::Lz4 => {
                lz4_flex::decompress_size_prepended(&data).context("Lz4 decompression failed")
            },
        }
    }
}

#[derive(Debug)]
pub struct FileStoreInner {
    /// Canonicalized root directory.
    pub(crate) root: PathBuf,
    pub(crate) compression: Compression,
    pub(crate) tmp_counter: AtomicU64,
}

/// A [`KeyValueStore`] persisted under a root directory.
///
/// The handle is reference-counted and cheap to clone.
///
/// # Example
///
/// ```rust
/// use fstone_storage::{Compression, FileStore, KeyValueStore, StorageError};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), StorageError> {
///     # let tmp = tempfile::tempdir().unwrap();
///     # let root = tmp.path().join("data");
///     let store = FileStore::builder()
///         .root(&root)
///         .create(true)
///         .compression(Compression::Lz4)
///         .connect()
///         .await?;
///
///     store.set("flags/dark_mode", "{\"enabled\":true}").await?;
///     assert_eq!(store.get("flags/dark_mode").await?.as_deref(), Some("{\"enabled\":true}"));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    pub(crate) inner: Arc<FileStoreInner>,
}

impl Deref for FileStore {
    type Target = FileStoreInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl FileStore {
    #[must_use = "The store is not initialized until you call .connect()"]
    pub fn builder() -> FileStoreBuilder {
        FileStoreBuilder::new()
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    /// Physical location of the value file for `key`.
    ///
    /// # Errors
    /// Returns [`StorageError::InvalidKey`] for keys that fail validation.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        let mut path = self.inner.root.clone();
        path.extend(key.split(SEPARATOR));
        path.push(VALUE_FILE);
        Ok(path)
    }

    /// Removes temp files left behind by interrupted writes.
    pub async fn purge_tmp(&self) {
        maintenance::purge_tmp(&self.inner.root).await;
    }

    async fn write_atomic(&self, resolved: &Path, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create key directory for {}", resolved.display()))?;
        }

        let temp = unique_tmp_path(resolved, &self.inner.tmp_counter);
        let final_data = self.inner.compression.compress(data);

        {
            let mut file = fs::OpenOptions::new()
                .create_new(true)
                .write(true)
                .open(&temp)
                .await
                .context(format!("Temp creation failed: {}", temp.display()))?;
            file.write_all(&final_data).await.context("Write failed")?;
            file.sync_all().await.context("Hardware sync failed")?;
        }

        if let Err(err) = fs::rename(&temp, resolved).await {
            if err.kind() == std::io::ErrorKind::AlreadyExists {
                fs::remove_file(resolved)
                    .await
                    .context(format!("Failed to replace existing file: {}", resolved.display()))?;
                fs::rename(&temp, resolved).await.context(format!(
                    "Atomic swap failed: {} -> {}",
                    temp.display(),
                    resolved.display()
                ))?;
            } else {
                let _ = fs::remove_file(&temp).await;
                return Err(StorageError::Io {
                    source: err,
                    context: Some(
                        format!("Atomic swap failed: {} -> {}", temp.display(), resolved.display())
                            .into(),
                    ),
                });
            }
        }

        if let Some(parent) = resolved.parent() {
            sync_dir(parent).await;
        }
        Ok(())
    }

    /// Removes now-empty key directories between `resolved` and the root.
    async fn prune_empty_dirs(&self, resolved: &Path) {
        let mut current = resolved.parent();
        while let Some(dir) = current {
            if dir == self.inner.root || fs::remove_dir(dir).await.is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let resolved = self.resolve(key)?;

        let data = match fs::read(&resolved).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Read failed: {}", resolved.display()).into()),
                });
            },
        };

        let bytes = self.inner.compression.decompress(data)?;
        String::from_utf8(bytes).context(format!("Key {key}")).map(Some)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let resolved = self.resolve(key)?;
        self.write_atomic(&resolved, value.as_bytes()).await?;
        debug!(key, path = %resolved.display(), "Value saved atomically");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let resolved = self.resolve(key)?;
        match fs::remove_file(&resolved).await {
            Ok(()) => {},
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(err) => {
                return Err(StorageError::Io {
                    source: err,
                    context: Some(format!("Failed to delete: {}", resolved.display()).into()),
                });
            },
        }
        self.prune_empty_dirs(&resolved).await;
        debug!(key, "Value deleted");
        Ok(true)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        validate_prefix(prefix)?;

        let root = self.inner.root.clone();
        let mut start = root.clone();
        if let Some((dir, _)) = prefix.rsplit_once(SEPARATOR) {
            start.extend(dir.split(SEPARATOR));
        }
        let prefix = prefix.to_owned();

        tokio::task::spawn_blocking(move || collect_keys(&root, &start, &prefix))
            .await
            .map_err(|e| StorageError::Internal {
                message: e.to_string().into(),
                context: Some("Key listing task failed".into()),
            })
    }
}

fn collect_keys(root: &Path, start: &Path, prefix: &str) -> Vec<String> {
    if !start.is_dir() {
        return Vec::new();
    }

    let mut keys: Vec<String> = WalkDir::new(start)
        .into_iter()
        .flatten()
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == VALUE_FILE)
        .filter_map(|entry| {
            let dir = entry.path().parent()?.strip_prefix(root).ok()?;
            let segments = dir
                .components()
                .map(|c| c.as_os_str().to_str())
                .collect::<Option<Vec<_>>>()?;
            (!segments.is_empty()).then(|| segments.join("/"))
        })
        .filter(|key| key.starts_with(prefix))
        .collect();

    keys.sort_unstable();
    keys
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                tracing::warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Directory open failed");
        },
    }
}

fn unique_tmp_path(target: &Path, counter: &AtomicU64) -> PathBuf {
    let counter = counter.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!("{VALUE_FILE}{TMP_MARKER}{counter}"))
}
