//! Lazy channel registry for auxiliary scopes.
//!
//! Folders and other low-priority scopes are many and mostly idle, so their
//! channels are expensive to keep open speculatively. The registry:
//!
//! - Queues handler registrations until an action explicitly triggers the
//!   subscription (folder creation, document upload)
//! - Keeps at most one transport channel per scope no matter how many
//!   handler sets are registered; handler sets accumulate, never replace
//! - Fans multiplexed events out by [`Topic`](crate::Topic) to exactly the
//!   callbacks registered for that stream
//!
//! Unlike the supervisor there is no automatic escalation here: a failed
//! channel is logged and left for the next `trigger_subscription` call to
//! re-establish.

use crate::{
    handlers::ScopeHandlers,
    models::EventEnvelope,
    timeouts::PulseLinkTimeouts,
    token::{now_ms, TokenCounter},
    transport::{ChannelStatus, EventFilter, TransportHandle, TransportProvider},
};
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc, RwLock,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

// Channel lifecycle as seen by the pump task.
const CHANNEL_JOINING: u8 = 0;
const CHANNEL_HEALTHY: u8 = 1;
const CHANNEL_FAILED: u8 = 2;

struct LiveChannel {
    #[allow(dead_code)]
    token: u64,
    state: Arc<AtomicU8>,
    pump: JoinHandle<()>,
    #[allow(dead_code)]
    created_at_ms: u64,
}

struct RegistryEntry {
    /// Accumulated handler sets; shared with the pump task.
    handlers: Arc<RwLock<Vec<ScopeHandlers>>>,
    /// The scope's current token; pump tasks compare against it before
    /// dispatching so a replaced channel can never deliver late.
    current_token: Arc<AtomicU64>,
    live: Option<LiveChannel>,
    /// Set while the registration is queued awaiting a trigger.
    queued_at_ms: Option<u64>,
}

impl Default for RegistryEntry {
    fn default() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
            current_token: Arc::new(AtomicU64::new(0)),
            live: None,
            queued_at_ms: None,
        }
    }
}

/// Manages lazily-connected channels for many auxiliary scopes.
pub struct ChannelRegistry {
    transport: Arc<dyn TransportProvider>,
    tokens: Arc<TokenCounter>,
    timeouts: PulseLinkTimeouts,
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

impl ChannelRegistry {
    /// Create a registry over the given transport.
    pub fn new(
        transport: Arc<dyn TransportProvider>,
        timeouts: PulseLinkTimeouts,
        tokens: Arc<TokenCounter>,
    ) -> Self {
        Self {
            transport,
            tokens,
            timeouts,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register handlers for a scope.
    ///
    /// With `immediate` the channel is established (or reused) now;
    /// otherwise the registration is queued until
    /// [`trigger_subscription`](Self::trigger_subscription) promotes it.
    /// Handler sets accumulate across calls.
    pub async fn subscribe(&self, scope: &str, handlers: ScopeHandlers, immediate: bool) {
        if scope.is_empty() {
            return;
        }
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(scope.to_string()).or_default();
        entry.handlers.write().unwrap().push(handlers);

        if immediate {
            self.establish(scope, entry).await;
        } else if entry.live.is_none() && entry.queued_at_ms.is_none() {
            entry.queued_at_ms = Some(now_ms());
            log::debug!("[pulse-link] queued subscription for scope {}", scope);
        }
    }

    /// Promote a queued registration to a live channel.
    ///
    /// Call right before an action that depends on live updates. Idempotent
    /// no-op when the scope's channel is already joining or healthy.
    pub async fn trigger_subscription(&self, scope: &str) {
        if scope.is_empty() {
            return;
        }
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(scope.to_string()).or_default();
        self.establish(scope, entry).await;
    }

    /// Tear down the scope's channel (if any) and forget its handlers.
    pub async fn unsubscribe(&self, scope: &str) {
        let removed = self.entries.lock().await.remove(scope);
        if let Some(entry) = removed {
            self.close_entry(scope, entry).await;
            log::debug!("[pulse-link] unsubscribed scope {}", scope);
        }
    }

    /// Tear down every channel and clear all registrations
    /// (logout/shutdown).
    pub async fn cleanup(&self) {
        let drained: Vec<(String, RegistryEntry)> =
            self.entries.lock().await.drain().collect();
        for (scope, entry) in drained {
            self.close_entry(&scope, entry).await;
        }
        log::debug!("[pulse-link] registry cleaned up");
    }

    /// Number of scopes with an established channel.
    pub async fn subscription_count(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.live.is_some())
            .count()
    }

    /// Number of registrations still queued awaiting a trigger.
    pub async fn pending_count(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| e.queued_at_ms.is_some())
            .count()
    }

    /// Whether the scope's channel is joining or healthy.
    pub async fn is_subscribed(&self, scope: &str) -> bool {
        self.entries
            .lock()
            .await
            .get(scope)
            .and_then(|e| e.live.as_ref())
            .map(|live| live.state.load(Ordering::Relaxed) != CHANNEL_FAILED)
            .unwrap_or(false)
    }

    // ── internals ──────────────────────────────────────────────────────

    /// Establish the scope's channel. No-op when one is already joining or
    /// healthy; a failed channel is replaced under a fresh token.
    async fn establish(&self, scope: &str, entry: &mut RegistryEntry) {
        if let Some(live) = &entry.live {
            if live.state.load(Ordering::Relaxed) != CHANNEL_FAILED {
                log::debug!("[pulse-link] scope {} already subscribed", scope);
                return;
            }
        }

        entry.queued_at_ms = None;
        if let Some(old) = entry.live.take() {
            old.pump.abort();
            if let Err(e) = self.transport.unsubscribe(scope).await {
                log::debug!(
                    "[pulse-link] unsubscribe of failed channel {} returned: {}",
                    scope,
                    e
                );
            }
        }

        let token = self.tokens.next();
        entry.current_token.store(token, Ordering::Relaxed);
        log::debug!(
            "[pulse-link] establishing channel for scope {} (token {})",
            scope,
            token
        );

        let connect = self.transport.subscribe(scope, EventFilter::all());
        let result = if PulseLinkTimeouts::is_no_timeout(self.timeouts.connect_timeout) {
            Ok(connect.await)
        } else {
            tokio::time::timeout(self.timeouts.connect_timeout, connect).await
        };

        match result {
            Ok(Ok(handle)) => {
                let state = Arc::new(AtomicU8::new(CHANNEL_JOINING));
                let pump = spawn_registry_pump(
                    handle,
                    scope.to_string(),
                    token,
                    entry.current_token.clone(),
                    state.clone(),
                    entry.handlers.clone(),
                );
                entry.live = Some(LiveChannel {
                    token,
                    state,
                    pump,
                    created_at_ms: now_ms(),
                });
            }
            Ok(Err(e)) => {
                log::warn!(
                    "[pulse-link] failed to open channel for scope {}: {}",
                    scope,
                    e
                );
            }
            Err(_) => {
                log::warn!(
                    "[pulse-link] channel open timed out for scope {} after {:?}",
                    scope,
                    self.timeouts.connect_timeout
                );
            }
        }
    }

    async fn close_entry(&self, scope: &str, entry: RegistryEntry) {
        if let Some(live) = entry.live {
            live.pump.abort();
            if let Err(e) = self.transport.unsubscribe(scope).await {
                log::debug!("[pulse-link] unsubscribe failed for scope {}: {}", scope, e);
            }
        }
    }
}

/// Read a registry channel's events and status, fanning surviving events
/// out to the accumulated handler sets.
fn spawn_registry_pump(
    mut handle: TransportHandle,
    scope: String,
    token: u64,
    current_token: Arc<AtomicU64>,
    chan_state: Arc<AtomicU8>,
    handlers: Arc<RwLock<Vec<ScopeHandlers>>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = handle.events.recv() => match event {
                    Some(raw) => {
                        if current_token.load(Ordering::Relaxed) != token {
                            log::debug!(
                                "[pulse-link] discarding stale event for scope {} (token {})",
                                scope,
                                token
                            );
                            break;
                        }
                        let envelope = EventEnvelope::from_raw(&scope, raw, now_ms());
                        for set in handlers.read().unwrap().iter() {
                            set.dispatch(&envelope);
                        }
                    }
                    None => break,
                },
                status = handle.status.recv() => match status {
                    Some(ChannelStatus::Subscribed) => {
                        chan_state.store(CHANNEL_HEALTHY, Ordering::Relaxed);
                        log::debug!("[pulse-link] scope {} subscribed", scope);
                    }
                    Some(status @ (ChannelStatus::TimedOut | ChannelStatus::ChannelError)) => {
                        chan_state.store(CHANNEL_FAILED, Ordering::Relaxed);
                        log::warn!(
                            "[pulse-link] channel {} for scope {}; will re-establish on next trigger",
                            status,
                            scope
                        );
                    }
                    Some(ChannelStatus::Closed) => {
                        chan_state.store(CHANNEL_FAILED, Ordering::Relaxed);
                        break;
                    }
                    None => break,
                },
            }
        }
    })
}
