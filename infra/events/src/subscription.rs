use crate::event::{EventKinds, IntegrationEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// A filtered view over the event bus.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<Arc<IntegrationEvent>>,
    kinds: EventKinds,
}

impl Subscription {
    pub(crate) const fn new(
        receiver: broadcast::Receiver<Arc<IntegrationEvent>>,
        kinds: EventKinds,
    ) -> Self {
        Self { receiver, kinds }
    }

    #[must_use]
    pub const fn kinds(&self) -> EventKinds {
        self.kinds
    }

    /// Waits for the next event matching the filter.
    ///
    /// A lagging subscription resumes at the oldest retained event. Returns `None`
    /// once the bus has been shut down and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Arc<IntegrationEvent>> {
        let mut skipped = 0u64;

        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if skipped > 0 {
                        warn!(skipped, "Event subscription lagged; continuing from oldest retained event");
                        skipped = 0;
                    }
                    if self.kinds.includes(event.kind) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    skipped = skipped.saturating_add(n);
                    debug!(skipped = n, total_skipped = skipped, "Event subscription lagged");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns the next matching event that is already buffered, without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<IntegrationEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.kinds.includes(event.kind) => return Some(event),
                Ok(_) => {},
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(skipped = n, "Event subscription lagged");
                },
                Err(_) => return None,
            }
        }
    }
}
