use crate::error::EventBusError;
use crate::event::{EventKinds, IntegrationEvent};
use crate::subscription::Subscription;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Buffer size for the broadcast channel.
/// Integration events are rare; 128 outlives any realistic burst of enables.
const DEFAULT_CAPACITY: usize = 128;
const MIN_CAPACITY: usize = 1;

type Sender = broadcast::Sender<Arc<IntegrationEvent>>;

/// Fan-out channel for [`IntegrationEvent`]s.
///
/// Clones share the same underlying channel. After [`EventBus::shutdown`] every
/// subscription drains to `None` and publishing becomes a no-op.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: Arc<RwLock<Option<Sender>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(DEFAULT_CAPACITY);
        Self { sender: Arc::new(RwLock::new(Some(tx))), capacity: DEFAULT_CAPACITY }
    }
}

impl EventBus {
    /// Creates a bus with the default buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus with a specific buffer capacity.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidCapacity`] if `capacity` is zero.
    ///
    /// # Examples
    /// ```rust
    /// use fstone_events::EventBus;
    ///
    /// # fn main() -> Result<(), fstone_events::EventBusError> {
    /// let bus = EventBus::with_capacity(16)?;
    /// assert_eq!(bus.capacity(), 16);
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_capacity(capacity: usize) -> Result<Self, EventBusError> {
        let capacity = validate_capacity(capacity)?;
        let (tx, _) = broadcast::channel(capacity);
        Ok(Self { sender: Arc::new(RwLock::new(Some(tx))), capacity })
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Subscribes to every event kind.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.subscribe_to(EventKinds::all())
    }

    /// Subscribes to the given set of event kinds.
    ///
    /// # Examples
    /// ```rust
    /// use fstone_events::{EventBus, EventKind, EventKinds, IntegrationEvent};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let bus = EventBus::new();
    /// let mut rx = bus.subscribe_to(EventKinds::FEATURE_ENABLED);
    /// bus.publish(IntegrationEvent::new(EventKind::MigrationStarted, "dark_mode", Default::default()));
    /// bus.publish(IntegrationEvent::new(EventKind::FeatureEnabled, "dark_mode", Default::default()));
    /// assert_eq!(rx.recv().await.unwrap().kind, EventKind::FeatureEnabled);
    /// # }
    /// ```
    #[must_use]
    pub fn subscribe_to(&self, kinds: EventKinds) -> Subscription {
        let receiver = if let Some(tx) = self.sender.read().as_ref() {
            tx.subscribe()
        } else {
            let (tx, rx) = broadcast::channel(MIN_CAPACITY);
            drop(tx);
            rx
        };
        trace!(kinds = ?kinds, "Subscription created");
        Subscription::new(receiver, kinds)
    }

    /// Publishes an event to every live subscription.
    ///
    /// Returns the number of receivers the event reached; zero receivers is not an error.
    pub fn publish(&self, event: IntegrationEvent) -> usize {
        self.publish_arc(Arc::new(event))
    }

    /// Publishes a shared event instance without re-wrapping.
    pub fn publish_arc(&self, event: Arc<IntegrationEvent>) -> usize {
        let Some(tx) = self.sender.read().clone() else {
            debug!(kind = %event.kind, feature = %event.feature, "Event dropped: bus is shut down");
            return 0;
        };

        tx.send(event).map_or_else(
            |err| {
                trace!(kind = %err.0.kind, "Event dropped: no active subscribers");
                0
            },
            |count| {
                trace!(count, "Event dispatched");
                count
            },
        )
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.read().as_ref().map_or(0, broadcast::Sender::receiver_count)
    }

    /// Closes the channel. Returns `true` if the bus was still open.
    pub fn shutdown(&self) -> bool {
        let closed = self.sender.write().take().is_some();
        if closed {
            debug!("Event bus shut down");
        }
        closed
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.sender.read().is_none()
    }
}

fn validate_capacity(capacity: usize) -> Result<usize, EventBusError> {
    if capacity < MIN_CAPACITY {
        return Err(EventBusError::InvalidCapacity {
            message: "Capacity must be greater than zero".into(),
            context: Some(format!("capacity = {capacity}").into()),
        });
    }
    Ok(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(EventBus::with_capacity(0), Err(EventBusError::InvalidCapacity { .. })));
    }

    #[test]
    fn publish_without_subscribers_reports_zero() {
        let bus = EventBus::new();
        let sent = bus.publish(IntegrationEvent::new(
            EventKind::FeatureEnabled,
            "dark_mode",
            serde_json::Value::Null,
        ));
        assert_eq!(sent, 0);
    }

    #[test]
    fn receiver_count_tracks_subscriptions() {
        let bus = EventBus::new();
        let first = bus.subscribe();
        let _second = bus.subscribe_to(EventKinds::MIGRATION);
        assert_eq!(bus.receiver_count(), 2);
        drop(first);
        assert_eq!(bus.receiver_count(), 1);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let bus = EventBus::new();
        assert!(bus.shutdown());
        assert!(!bus.shutdown());
        assert!(bus.is_shut_down());
        assert_eq!(bus.receiver_count(), 0);
    }
}
