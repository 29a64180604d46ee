//! # Events
//!
//! The core-owned publish/subscribe channel for integration events.
//!
//! The integration coordinator publishes an [`IntegrationEvent`] whenever a feature is
//! enabled or disabled, a migration starts or completes, or a compatibility issue is found.
//! UI adapters and audit sinks subscribe externally; the core never depends on them.
//!
//! * **Fan-out**: every [`Subscription`] sees every event published after it was created.
//! * **Filtering**: [`EventBus::subscribe_to`] takes an [`EventKinds`] bit set.
//! * **Lag tolerant**: slow subscribers skip ahead instead of blocking publishers.
//!
//! # Example
//!
//! ```rust
//! use fstone_events::{EventBus, EventKind, IntegrationEvent};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let bus = EventBus::new();
//!     let mut rx = bus.subscribe();
//!
//!     bus.publish(IntegrationEvent::new(
//!         EventKind::FeatureEnabled,
//!         "dark_mode",
//!         serde_json::json!({ "user_id": "u1" }),
//!     ));
//!
//!     let event = rx.recv().await.unwrap();
//!     assert_eq!(event.feature, "dark_mode");
//! }
//! ```

mod bus;
mod error;
mod event;
mod subscription;

pub use bus::EventBus;
pub use error::{EventBusError, EventBusErrorExt};
pub use event::{EventKind, EventKinds, IntegrationEvent};
pub use subscription::Subscription;
