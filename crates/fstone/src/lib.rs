//! Facade crate for Flagstone.
//! Re-exports the component crates and assembles them into one [`Platform`] service object.
//! Keep this crate thin: it composes other crates, it does not implement business logic.
//!
//! ## Usage
//! Build the platform once at the entry point and pass it by reference; there is no global
//! instance.
//!
//! ```rust
//! use fstone::domain::constants::{ACCESSIBILITY, DARK_MODE};
//! use fstone::Platform;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let platform = Platform::builder().build().await?;
//!
//! assert!(platform.enable_feature(DARK_MODE, Some("u1")).await?);
//! assert!(platform.is_feature_enabled(DARK_MODE));
//! assert!(platform.recommendations(Some("u1")).await?.iter().any(|r| r.feature == ACCESSIBILITY));
//! # Ok(())
//! # }
//! ```

mod error;
mod platform;

pub use crate::error::{PlatformError, PlatformErrorExt};
pub use crate::platform::{Platform, PlatformBuilder};

pub use fstone_compat as compat;
pub use fstone_domain as domain;
pub use fstone_events as events;
pub use fstone_flags as flags;
pub use fstone_integration as integration;
pub use fstone_kernel as kernel;
pub use fstone_logger as logger;
pub use fstone_migration as migration;
pub use fstone_registry as registry;
pub use fstone_storage as storage;
pub use fstone_validation as validation;

pub use fstone_integration::{Coordinator, HealthStatus, IntegrationError, Recommendation};
