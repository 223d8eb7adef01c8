//! Session/credential refresh seam.
//!
//! The supervisor refreshes credentials exactly once before a cold
//! reconnect that follows a provider-reported channel error; everything
//! else about authentication lives in the host. Implementations are
//! expected to make refreshed credentials visible to the transport
//! provider (typically both sides share a token store).

use crate::error::Result;
use async_trait::async_trait;

/// Credentials returned by a session refresh.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Opaque access token understood by the transport provider.
    pub access_token: String,
    /// Expiry in millis since Unix epoch, when known.
    pub expires_at_ms: Option<u64>,
}

impl Credentials {
    /// Create credentials with no known expiry.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at_ms: None,
        }
    }
}

/// Async credential refresh hook.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Refresh the session and return fresh credentials.
    async fn refresh_session(&self) -> Result<Credentials>;
}

/// A session provider that always returns the same credentials.
///
/// Useful for anonymous deployments and tests; "refreshing" is a no-op.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: String,
}

impl StaticSession {
    /// A static session carrying `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// An anonymous static session (empty token).
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn refresh_session(&self) -> Result<Credentials> {
        Ok(Credentials::new(self.token.clone()))
    }
}
