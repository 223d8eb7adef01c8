//! Main pulse-link client with builder pattern.
//!
//! Wires the supervisor, registry and event bus over injected transport and
//! session providers. Built once at startup and shared by reference; there
//! are no global singletons, which is what makes the whole stack testable
//! against fake providers.

use crate::{
    bus::EventBus,
    error::{PulseLinkError, Result},
    models::EventEnvelope,
    registry::ChannelRegistry,
    session::{SessionProvider, StaticSession},
    supervisor::ConnectionSupervisor,
    timeouts::PulseLinkTimeouts,
    token::TokenCounter,
    transport::TransportProvider,
    wake::{WakeSignal, WakeTrigger},
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Main realtime client.
///
/// Use [`PulseLinkClientBuilder`] to construct instances with custom
/// configuration.
///
/// # Examples
///
/// ```rust,no_run
/// use pulse_link::{PulseLinkClient, PulseLinkTimeouts, TransportProvider};
/// use std::sync::Arc;
///
/// # async fn example(transport: Arc<dyn TransportProvider>) -> pulse_link::Result<()> {
/// let client = PulseLinkClient::builder()
///     .transport(transport)
///     .timeouts(PulseLinkTimeouts::fast())
///     .build()?;
///
/// // Focus the open conversation; events arrive on the bus.
/// let mut events = client.events();
/// client.supervisor().subscribe("chat-1").await;
///
/// while let Ok(event) = events.recv().await {
///     println!("{:?} on {}", event.kind, event.scope_key);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PulseLinkClient {
    supervisor: Arc<ConnectionSupervisor>,
    registry: Arc<ChannelRegistry>,
    bus: EventBus,
    timeouts: PulseLinkTimeouts,
    tokens: Arc<TokenCounter>,
}

impl PulseLinkClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> PulseLinkClientBuilder {
        PulseLinkClientBuilder::new()
    }

    /// The focused-scope connection supervisor.
    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor> {
        &self.supervisor
    }

    /// The lazy channel registry for auxiliary scopes.
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Subscribe to the normalized event stream.
    pub fn events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.bus.subscribe()
    }

    /// The underlying event bus (cloneable).
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The configured timer windows.
    pub fn timeouts(&self) -> &PulseLinkTimeouts {
        &self.timeouts
    }

    /// The shared subscription-token counter.
    pub fn tokens(&self) -> &Arc<TokenCounter> {
        &self.tokens
    }

    /// Spawn the wake trigger over a host-provided signal receiver.
    ///
    /// Keep the returned handle alive; dropping it stops the trigger.
    pub fn spawn_wake_trigger(&self, signals: mpsc::Receiver<WakeSignal>) -> WakeTrigger {
        WakeTrigger::spawn(signals, self.supervisor.clone(), &self.timeouts)
    }

    /// Tear down the supervisor channel and every registry channel.
    pub async fn shutdown(&self) {
        self.supervisor.cleanup().await;
        self.registry.cleanup().await;
    }
}

/// Builder for [`PulseLinkClient`].
pub struct PulseLinkClientBuilder {
    transport: Option<Arc<dyn TransportProvider>>,
    session: Option<Arc<dyn SessionProvider>>,
    timeouts: PulseLinkTimeouts,
    bus: Option<EventBus>,
}

impl PulseLinkClientBuilder {
    fn new() -> Self {
        Self {
            transport: None,
            session: None,
            timeouts: PulseLinkTimeouts::default(),
            bus: None,
        }
    }

    /// Set the transport provider (required).
    pub fn transport(mut self, transport: Arc<dyn TransportProvider>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the session provider. Defaults to an anonymous static session.
    pub fn session(mut self, session: Arc<dyn SessionProvider>) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the timer windows. Defaults to [`PulseLinkTimeouts::default`].
    pub fn timeouts(mut self, timeouts: PulseLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Use an existing bus instead of creating one (e.g. to share a stream
    /// across clients in tests).
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Build the client, spawning the supervisor actor.
    pub fn build(self) -> Result<PulseLinkClient> {
        let transport = self.transport.ok_or_else(|| {
            PulseLinkError::InternalError("transport provider is required".to_string())
        })?;
        let session = self
            .session
            .unwrap_or_else(|| Arc::new(StaticSession::anonymous()));
        let bus = self.bus.unwrap_or_default();
        let tokens = Arc::new(TokenCounter::new());

        let supervisor = Arc::new(ConnectionSupervisor::new(
            transport.clone(),
            session,
            bus.clone(),
            self.timeouts.clone(),
            tokens.clone(),
        ));
        let registry = Arc::new(ChannelRegistry::new(
            transport,
            self.timeouts.clone(),
            tokens.clone(),
        ));

        Ok(PulseLinkClient {
            supervisor,
            registry,
            bus,
            timeouts: self.timeouts,
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_transport_fails() {
        let result = PulseLinkClient::builder().build();
        assert!(matches!(result, Err(PulseLinkError::InternalError(_))));
    }
}
