//! Error types for the pulse-link client.

use thiserror::Error;

/// Errors surfaced by pulse-link operations.
///
/// Transient transport conditions (confirmation timeouts, provider-reported
/// channel errors) are handled internally by the bounded reconnect
/// escalation and are never returned from `subscribe`/`ensure_connected`;
/// these variants cover construction-time and transport-boundary failures.
#[derive(Error, Debug)]
pub enum PulseLinkError {
    /// Transport provider failed to open or close a channel.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// An operation did not complete within its configured window.
    #[error("Transport timeout: {0}")]
    TimeoutError(String),

    /// Provider-reported channel failure (auth/permission/protocol).
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Credential refresh failed.
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Invalid configuration or internal invariant violation.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Result type for pulse-link operations.
pub type Result<T> = std::result::Result<T, PulseLinkError>;
