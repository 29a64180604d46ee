//! # Migration Orchestrator
//!
//! Runs the data migrations a feature needs before it may be committed. A
//! [`MigrationTask`] transforms a user's [`UserSnapshot`] (the `data`, `preferences` and
//! `customizations` documents under `users/<id>/`); the [`MigrationOrchestrator`] orders a
//! feature's tasks (dependencies first, then priority), validates and executes them with
//! retries, rolls completed work back on failure, and keeps a status history per task under
//! `migrations/<task>`.
//!
//! ```rust
//! use fstone_domain::Feature;
//! use fstone_domain::config::MigrationSettings;
//! use fstone_migration::{MigrationOrchestrator, catalog};
//! use fstone_storage::MemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), fstone_migration::MigrationError> {
//! let orchestrator = MigrationOrchestrator::new(Arc::new(MemoryStore::new()), &MigrationSettings::default())?;
//! for task in catalog::builtin_tasks() {
//!     orchestrator.register_task(task)?;
//! }
//!
//! let run = orchestrator.run(&Feature::new("dark_mode", "Dark mode"), Some("u1")).await?;
//! assert!(run.success());
//! assert!(!orchestrator.check_needed("dark_mode"));
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod context;
mod error;
mod orchestrator;
mod order;
mod task;

pub use crate::context::{MigrationContext, UserSnapshot};
pub use crate::error::{MigrationError, MigrationErrorExt};
pub use crate::orchestrator::{MIGRATIONS_NAMESPACE, MigrationOrchestrator, MigrationRun};
pub use crate::task::{MigrationTask, TaskSpec};
