//! # pulse-link
//!
//! Client-side realtime subscription layer. Keeps a local view of live data
//! (conversation messages, folder contents) synchronized with a server-side
//! publish/subscribe broadcast service across network loss, device
//! sleep/wake, visibility changes, and rapid scope switching.
//!
//! The crate provides:
//!
//! - [`ConnectionSupervisor`]: one supervised channel for the focused scope,
//!   with token-based stale-event suppression and a bounded warm→cold
//!   reconnect ladder
//! - [`ChannelRegistry`]: lazy channels for many auxiliary scopes, promoted
//!   on demand and multiplexed to accumulated handler sets by topic
//! - [`WakeTrigger`]: debounced visibility/online/focus signals driving a
//!   warm check, plus idle pause for backgrounded sessions
//! - [`EventBus`]: the normalized [`EventEnvelope`] stream consumers read
//!
//! The pub/sub transport and the session refresh flow are injected via the
//! [`TransportProvider`] and [`SessionProvider`] traits; the crate never
//! speaks a wire protocol itself.
//!
//! Delivery is best-effort, at-most-once: events invalidate local state,
//! they do not replace an authoritative read. Nothing is redelivered across
//! a reconnect.

pub mod bus;
pub mod client;
pub mod error;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod session;
pub mod supervisor;
pub mod timeouts;
pub mod token;
pub mod transport;
pub mod wake;

pub use bus::EventBus;
pub use client::{PulseLinkClient, PulseLinkClientBuilder};
pub use error::{PulseLinkError, Result};
pub use handlers::{EventCallback, ScopeHandlers};
pub use models::{EventEnvelope, EventKind, Topic};
pub use registry::ChannelRegistry;
pub use session::{Credentials, SessionProvider, StaticSession};
pub use supervisor::{ConnectionSupervisor, LinkState};
pub use timeouts::{PulseLinkTimeouts, PulseLinkTimeoutsBuilder};
pub use token::TokenCounter;
pub use transport::{
    ChannelStatus, EventFilter, RawEvent, TransportHandle, TransportProvider,
};
pub use wake::{WakeSignal, WakeTrigger};
