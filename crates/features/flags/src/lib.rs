//! # Flag Evaluator
//!
//! Decides, for a flag and an [`EvaluationContext`](fstone_domain::EvaluationContext),
//! whether the flag is active. Evaluation runs four steps and stops at the first that rejects:
//!
//! 1. the stored switch (`enabled`);
//! 2. group targeting: at least one of the context's groups must be listed;
//! 3. percentage rollout: the `(user, flag)` pair is hashed into a stable bucket `0..100`
//!    (see [`bucket()`]) and admitted iff `bucket < percentage`;
//! 4. every [`Condition`] must match.
//!
//! Results are cached per flag and context fingerprint with a fixed TTL; changing a flag
//! drops its cached results. Definitions are written through to the injected store under
//! `flags/<id>` and reloaded with [`FlagEvaluator::load`].
//!
//! ```rust
//! use fstone_domain::EvaluationContext;
//! use fstone_domain::config::FlagSettings;
//! use fstone_flags::{FlagEvaluator, FlagOptions};
//! use fstone_storage::MemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), fstone_flags::FlagError> {
//! let flags = FlagEvaluator::new(Arc::new(MemoryStore::new()), &FlagSettings::default())?;
//! flags.register("search", true, FlagOptions::default().percentage(100.0)).await?;
//!
//! assert!(flags.is_enabled("search", &EvaluationContext::for_user("u1")));
//! assert!(!flags.is_enabled("unknown", &EvaluationContext::anonymous()));
//! # Ok(())
//! # }
//! ```

pub mod bucket;
mod condition;
mod decision;
mod definition;
mod error;
mod evaluator;

pub use crate::bucket::{bucket, is_eligible};
pub use crate::condition::{Condition, Operator};
pub use crate::decision::{DecisionReason, FlagDecision};
pub use crate::definition::{FlagDefinition, FlagOptions};
pub use crate::error::{FlagError, FlagErrorExt};
pub use crate::evaluator::{CacheStats, FLAGS_NAMESPACE, FlagEvaluator, ImportSummary};
