//! Shared fakes for integration tests: an in-memory transport provider and
//! a counting session provider. Both record every call so tests can assert
//! exactly how many network operations a flow performed.

#![allow(dead_code)] // each test binary uses a different slice of these helpers

use async_trait::async_trait;
use pulse_link::{
    ChannelStatus, Credentials, EventFilter, PulseLinkError, RawEvent, Result,
    SessionProvider, TransportHandle, TransportProvider,
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Opt-in log output: `RUST_LOG=debug cargo test -- --nocapture`.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Sender side of one fake channel, retained so tests can emit events and
/// status transitions at will, including after the channel was replaced,
/// to model in-flight deliveries from a torn-down channel.
#[derive(Clone)]
pub struct ChannelControl {
    pub event_tx: mpsc::Sender<RawEvent>,
    pub status_tx: mpsc::Sender<ChannelStatus>,
}

/// In-memory transport provider.
pub struct FakeTransport {
    channels: Mutex<HashMap<String, ChannelControl>>,
    subscribe_calls: Mutex<Vec<String>>,
    unsubscribe_calls: Mutex<Vec<String>>,
    /// When set, `subscribe` fails with a transport error.
    fail_subscribe: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            channels: Mutex::new(HashMap::new()),
            subscribe_calls: Mutex::new(Vec::new()),
            unsubscribe_calls: Mutex::new(Vec::new()),
            fail_subscribe: AtomicBool::new(false),
        })
    }

    /// Make subsequent `subscribe` calls fail.
    pub fn set_fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::Relaxed);
    }

    /// Emit a confirmation/status on the named channel's current senders.
    /// Returns `false` when the channel is gone or the pump stopped.
    pub async fn emit_status(&self, channel: &str, status: ChannelStatus) -> bool {
        let control = match self.channels.lock().unwrap().get(channel) {
            Some(control) => control.clone(),
            None => return false,
        };
        control.status_tx.send(status).await.is_ok()
    }

    /// Emit a raw event on the named channel's current senders.
    pub async fn emit_event(
        &self,
        channel: &str,
        topic: &str,
        event: &str,
        payload: JsonValue,
    ) -> bool {
        let control = match self.channels.lock().unwrap().get(channel) {
            Some(control) => control.clone(),
            None => return false,
        };
        control
            .event_tx
            .send(RawEvent::new(topic, event, payload))
            .await
            .is_ok()
    }

    /// Clone the named channel's senders (to emit after teardown).
    pub fn control(&self, channel: &str) -> Option<ChannelControl> {
        self.channels.lock().unwrap().get(channel).cloned()
    }

    /// Channels currently open (subscribed but not yet unsubscribed).
    pub fn open_channels(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    /// How many times `subscribe` was called for `channel`.
    pub fn subscribe_count(&self, channel: &str) -> usize {
        self.subscribe_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|name| name.as_str() == channel)
            .count()
    }

    /// Total `subscribe` calls across all channels.
    pub fn total_subscribes(&self) -> usize {
        self.subscribe_calls.lock().unwrap().len()
    }

    /// How many times `unsubscribe` was called for `channel`.
    pub fn unsubscribe_count(&self, channel: &str) -> usize {
        self.unsubscribe_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|name| name.as_str() == channel)
            .count()
    }
}

#[async_trait]
impl TransportProvider for FakeTransport {
    async fn subscribe(&self, channel_name: &str, _filter: EventFilter) -> Result<TransportHandle> {
        self.subscribe_calls
            .lock()
            .unwrap()
            .push(channel_name.to_string());
        if self.fail_subscribe.load(Ordering::Relaxed) {
            return Err(PulseLinkError::TransportError(
                "forced subscribe failure".to_string(),
            ));
        }

        let (event_tx, events) = mpsc::channel(64);
        let (status_tx, status) = mpsc::channel(16);
        self.channels.lock().unwrap().insert(
            channel_name.to_string(),
            ChannelControl {
                event_tx,
                status_tx,
            },
        );
        Ok(TransportHandle {
            channel_name: channel_name.to_string(),
            events,
            status,
        })
    }

    async fn unsubscribe(&self, channel_name: &str) -> Result<()> {
        self.unsubscribe_calls
            .lock()
            .unwrap()
            .push(channel_name.to_string());
        self.channels.lock().unwrap().remove(channel_name);
        Ok(())
    }
}

/// Session provider counting refresh calls.
pub struct FakeSession {
    refreshes: AtomicUsize,
}

impl FakeSession {
    pub fn new() -> std::sync::Arc<Self> {
        std::sync::Arc::new(Self {
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SessionProvider for FakeSession {
    async fn refresh_session(&self) -> Result<Credentials> {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(Credentials::new("refreshed-token"))
    }
}
