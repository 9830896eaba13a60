//! Broadcast bus for distributing `ProgressEvent` to multiple subscribers.
//!
//! Built on `tokio::sync::broadcast`. Publishing is fire-and-forget: with no
//! active subscribers the event is dropped, and a lagging subscriber never
//! blocks the pipeline.

use tokio::sync::broadcast;
use toolsmith_types::event::ProgressEvent;

/// Multi-consumer progress channel for construction jobs.
///
/// Cloning the bus clones the sender, allowing multiple producers and
/// consumers.
pub struct ProgressBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    /// Create a new bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no subscribers, the event is silently dropped.
    pub fn publish(&self, event: ProgressEvent) {
        let _ = self.sender.send(event);
    }
}

impl Clone for ProgressBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for ProgressBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}
