//! Local event bus.
//!
//! The only consumer-facing interface for supervisor-scope events: a
//! process-wide broadcast of normalized [`EventEnvelope`]s, decoupled from
//! the transport so any number of stores can observe the stream without
//! ever touching a channel handle.

use crate::models::EventEnvelope;
use tokio::sync::broadcast;

/// Default buffer size for the bus.
const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Broadcast bus for normalized realtime events.
///
/// Cloning is cheap; all clones publish into the same stream. A slow
/// subscriber that lags past the buffer misses events; the stream is an
/// invalidation signal, not a reliable queue.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUS_CAPACITY)
    }

    /// Create a bus with a custom buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an envelope to all subscribers.
    pub(crate) fn publish(&self, envelope: EventEnvelope) {
        if self.tx.send(envelope).is_err() {
            // No subscribers right now; the stream is best-effort.
            log::debug!("[pulse-link] event dropped, no bus subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventKind, Topic};
    use serde_json::json;

    fn envelope(kind: EventKind) -> EventEnvelope {
        EventEnvelope {
            scope_key: "chat-1".to_string(),
            topic: Topic::Messages,
            kind,
            payload: json!({"id": 1}),
            received_at_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(envelope(EventKind::MessageInsert));
    }

    #[tokio::test]
    async fn test_all_subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(envelope(EventKind::MessageInsert));

        assert_eq!(a.recv().await.unwrap().kind, EventKind::MessageInsert);
        assert_eq!(b.recv().await.unwrap().kind, EventKind::MessageInsert);
    }

    #[tokio::test]
    async fn test_clones_share_the_stream() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.clone().publish(envelope(EventKind::ConversationUpdate));

        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ConversationUpdate);
    }
}
