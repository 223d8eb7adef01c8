//! The opaque pub/sub transport boundary.
//!
//! pulse-link never speaks a wire protocol itself. A host supplies a
//! [`TransportProvider`] that can open a live channel for a scope and hand
//! back a [`TransportHandle`] carrying two bounded receivers: one for raw
//! broadcast events and one for channel status transitions. Everything the
//! crate knows about the provider is in this module.

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::fmt;
use tokio::sync::mpsc;

/// Default capacity for a channel's event receiver.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Default capacity for a channel's status receiver.
pub const DEFAULT_STATUS_CHANNEL_CAPACITY: usize = 16;

/// Status transitions a provider reports for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// The channel is live and confirmed by the broadcast layer.
    Subscribed,
    /// The provider gave up waiting for a confirmation.
    TimedOut,
    /// Auth/permission/protocol failure reported by the provider.
    ChannelError,
    /// The channel was closed (by either side).
    Closed,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelStatus::Subscribed => write!(f, "SUBSCRIBED"),
            ChannelStatus::TimedOut => write!(f, "TIMED_OUT"),
            ChannelStatus::ChannelError => write!(f, "CHANNEL_ERROR"),
            ChannelStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A raw broadcast event as delivered by the provider, before decoding.
///
/// `topic` is the provider's source discriminator (table or stream name),
/// `event` its event-type string. Both are normalized exactly once, at this
/// boundary, into an [`EventEnvelope`](crate::EventEnvelope).
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// Source discriminator (e.g. `conversations`, `folder_documents`).
    pub topic: String,
    /// Provider event-type string (e.g. `message-insert`, `INSERT`).
    pub event: String,
    /// Opaque payload.
    pub payload: JsonValue,
}

impl RawEvent {
    /// Convenience constructor.
    pub fn new(
        topic: impl Into<String>,
        event: impl Into<String>,
        payload: JsonValue,
    ) -> Self {
        Self {
            topic: topic.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Server-side filter applied when opening a channel.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Restrict delivery to one event-type string. `None` means all events.
    pub event: Option<String>,
}

impl EventFilter {
    /// Match every event on the channel.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match a single event-type string.
    pub fn only(event: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
        }
    }
}

/// Handle to one live transport channel.
///
/// The receivers are owned exclusively by the pump task the supervisor or
/// registry spawns for the channel; consumers never see this handle.
pub struct TransportHandle {
    /// The channel name this handle was opened for.
    pub channel_name: String,
    /// Inbound broadcast events.
    pub events: mpsc::Receiver<RawEvent>,
    /// Channel status transitions.
    pub status: mpsc::Receiver<ChannelStatus>,
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("channel_name", &self.channel_name)
            .finish()
    }
}

/// The pub/sub broadcast provider.
///
/// Implementations wrap whatever wire protocol the deployment uses; the
/// crate depends only on channel name + topic + event type + payload shape.
/// One channel per name: a second `subscribe` for a name the provider
/// already serves should replace or reject, never duplicate.
#[async_trait]
pub trait TransportProvider: Send + Sync {
    /// Open a live channel and return its handle.
    async fn subscribe(&self, channel_name: &str, filter: EventFilter) -> Result<TransportHandle>;

    /// Close the channel for `channel_name`. Closing an unknown channel is
    /// a no-op.
    async fn unsubscribe(&self, channel_name: &str) -> Result<()>;
}
