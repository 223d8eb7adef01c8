use super::{event_kind::EventKind, topic::Topic};
use crate::transport::RawEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Normalized, transport-agnostic representation of one inbound event.
///
/// Decoded exactly once at the transport boundary; everything downstream
/// (bus subscribers, registry handler sets) only ever sees this shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// The scope (conversation id, folder id) the event belongs to.
    pub scope_key: String,
    /// Source discriminator used for handler fan-out.
    pub topic: Topic,
    /// Decoded event type.
    pub kind: EventKind,
    /// Opaque payload as delivered by the provider.
    pub payload: JsonValue,
    /// Millis since Unix epoch when the event crossed the boundary.
    pub received_at_ms: u64,
}

impl EventEnvelope {
    /// Decode a raw provider event into the normalized shape.
    ///
    /// The topic is taken from the wire when recognizable, otherwise
    /// derived from the decoded kind, so events that only carry an
    /// event-type string still route correctly.
    pub(crate) fn from_raw(scope_key: &str, raw: RawEvent, received_at_ms: u64) -> Self {
        let wire_topic = Topic::from_wire(&raw.topic);
        let kind = EventKind::from_wire(&raw.event, wire_topic);
        let topic = if wire_topic == Topic::Unknown {
            kind.topic()
        } else {
            wire_topic
        };

        if kind == EventKind::Unknown {
            log::debug!(
                "[pulse-link] unrecognized event '{}' on topic '{}' for scope {}",
                raw.event,
                raw.topic,
                scope_key
            );
        }

        Self {
            scope_key: scope_key.to_string(),
            topic,
            kind,
            payload: raw.payload,
            received_at_ms,
        }
    }
}
