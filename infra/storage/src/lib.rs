//! Persistence collaborator for the Flagstone engine.
//!
//! The engine components never touch a backing technology directly: they receive a
//! [`SharedStore`] (an `Arc<dyn KeyValueStore>`) and read/write string values by key.
//!
//! # Backends
//!
//! - **[`MemoryStore`]**: an in-process map, the default and the one used in tests.
//! - **[`FileStore`]**: one directory per key under a root, atomic writes
//!   (unique temp file + `fsync` + `rename`), optional transparent LZ4 compression,
//!   and purge of orphaned temp files on connect.
//! - **[`NamespacedStore`]**: a scoped view used to partition `flags/…`,
//!   `migrations/…` and `users/<user>/…`.
//!
//! # Keys
//!
//! Keys are `/`-separated segments of `[a-z0-9_.%-]` that never start with a dot.
//! Use [`encode_segment`] to embed arbitrary identifiers such as user ids.
//!
//! # Examples
//!
//! ```rust
//! use fstone_storage::{KeyValueStore, MemoryStore, NamespacedStore, SharedStore, encode_segment};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), fstone_storage::StorageError> {
//! let store: SharedStore = Arc::new(MemoryStore::new());
//! let user = NamespacedStore::new(store.clone(), &format!("users/{}", encode_segment("Alice")))?;
//!
//! user.set("preferences", r#"{"theme":"dark"}"#).await?;
//! assert_eq!(store.keys("users/").await?, vec!["users/%41lice/preferences"]);
//! # Ok(())
//! # }
//! ```

mod builder;
mod engine;
mod error;
mod key;
mod maintenance;
mod memory;
mod namespace;
mod store;

pub use builder::FileStoreBuilder;
pub use engine::{Compression, FileStore};
pub use error::{StorageError, StorageErrorExt};
pub use key::{SEPARATOR, encode_segment, join_key, validate_key};
pub use memory::MemoryStore;
pub use namespace::NamespacedStore;
pub use store::{KeyValueStore, SharedStore};
