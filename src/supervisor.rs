//! Connection supervisor for the single focused scope.
//!
//! Owns at most one transport channel, bound to whichever scope the user
//! currently has in the foreground (the open conversation). Handles:
//!
//! - Rebinding on scope switch, with token-based invalidation of the old
//!   channel's in-flight events (no zombie deliveries)
//! - A bounded confirmation ladder: one warm check, then at most one
//!   automatic cold reconnect, then wait for an external trigger
//! - Credential refresh before a cold reconnect that follows a
//!   provider-reported channel error
//! - Pause/resume for backgrounded sessions (scope retained)
//! - Normalizing surviving events onto the local [`EventBus`]
//!
//! All transitions are serialized through one background actor task; public
//! methods only send commands, so timer fires, provider status callbacks and
//! caller turns can never interleave mid-transition.

use crate::{
    bus::EventBus,
    models::EventEnvelope,
    session::SessionProvider,
    timeouts::PulseLinkTimeouts,
    token::{now_ms, TokenCounter},
    transport::{ChannelStatus, EventFilter, RawEvent, TransportHandle, TransportProvider},
};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, RwLock,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};

const CMD_CHANNEL_CAPACITY: usize = 64;
const INBOUND_CHANNEL_CAPACITY: usize = 1024;

/// Maximum sleep duration that won't overflow `Instant + Duration`.
/// ~100 years is far enough into the future to be effectively "never".
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Automatic reconnect attempts per subscribe cycle: one warm + one cold.
const MAX_AUTO_ATTEMPTS: u8 = 2;

/// Supervisor connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No scope bound (initial, after `cleanup()`, or while paused).
    Unbound,
    /// A channel open was issued; awaiting confirmation.
    Subscribing,
    /// The provider confirmed the channel.
    Connected,
    /// Confirmation never arrived within the ladder's windows.
    TimedOut,
    /// The provider reported a channel failure.
    ChannelError,
}

// ── Commands ────────────────────────────────────────────────────────────────

enum SupervisorCmd {
    /// Rebind to a new focused scope.
    Subscribe {
        scope: String,
        ack: oneshot::Sender<()>,
    },
    /// Warm check: no-op when healthy, otherwise one bounded recovery cycle.
    EnsureConnected,
    /// Tear the channel down but keep the bound scope for a later resume.
    Pause,
    /// Undo a pause and run a warm check.
    Resume,
    /// Tear everything down and forget the scope.
    Cleanup { ack: oneshot::Sender<()> },
    /// Terminate the actor.
    Shutdown,
}

/// Token-tagged input forwarded by a channel's pump task.
enum Inbound {
    Event { token: u64, raw: RawEvent },
    Status { token: u64, status: ChannelStatus },
}

// ── Shared snapshot ─────────────────────────────────────────────────────────

/// State mirror the actor keeps updated for cheap inspection.
struct SupervisorShared {
    state: RwLock<LinkState>,
    scope: RwLock<Option<String>>,
    token: AtomicU64,
    connected: AtomicBool,
}

// ── Public handle ───────────────────────────────────────────────────────────

/// Supervises the single focused-scope transport channel.
///
/// Constructed once at startup with injected providers and shared by
/// reference; see [`PulseLinkClient`](crate::PulseLinkClient) for the usual
/// wiring.
pub struct ConnectionSupervisor {
    cmd_tx: mpsc::Sender<SupervisorCmd>,
    shared: Arc<SupervisorShared>,
    _task: JoinHandle<()>,
}

impl ConnectionSupervisor {
    /// Create a supervisor and spawn its actor task.
    pub fn new(
        transport: Arc<dyn TransportProvider>,
        session: Arc<dyn SessionProvider>,
        bus: EventBus,
        timeouts: PulseLinkTimeouts,
        tokens: Arc<TokenCounter>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);

        let shared = Arc::new(SupervisorShared {
            state: RwLock::new(LinkState::Unbound),
            scope: RwLock::new(None),
            token: AtomicU64::new(0),
            connected: AtomicBool::new(false),
        });

        let actor = SupervisorActor {
            transport,
            session,
            bus,
            timeouts,
            tokens,
            shared: shared.clone(),
            inbound_tx,
            scope: None,
            token: 0,
            state: LinkState::Unbound,
            channel: None,
            auto_attempts: 0,
            reconnect_in_flight: false,
            paused: false,
            last_failure: None,
            check_deadline: None,
            retry_deadline: None,
        };

        let task = tokio::spawn(actor.run(cmd_rx, inbound_rx));

        Self {
            cmd_tx,
            shared,
            _task: task,
        }
    }

    /// Rebind the supervisor to `scope`.
    ///
    /// Increments the subscription token (invalidating the previous
    /// channel's in-flight events), tears the old channel down, issues the
    /// new open and arms the confirmation timer. Returns once the rebind
    /// has been issued; does not wait for confirmation. After this returns,
    /// no event captured under a pre-call token can reach the bus.
    pub async fn subscribe(&self, scope: impl Into<String>) {
        let (ack, ack_rx) = oneshot::channel();
        let cmd = SupervisorCmd::Subscribe {
            scope: scope.into(),
            ack,
        };
        if self.cmd_tx.send(cmd).await.is_ok() {
            let _ = ack_rx.await;
        }
    }

    /// Idempotent warm check: no-op when connected with a live channel,
    /// otherwise starts one bounded recovery cycle.
    pub async fn ensure_connected(&self) {
        let _ = self.cmd_tx.send(SupervisorCmd::EnsureConnected).await;
    }

    /// Tear the channel down but retain the bound scope.
    pub async fn pause(&self) {
        let _ = self.cmd_tx.send(SupervisorCmd::Pause).await;
    }

    /// Undo a pause and run a warm check for the retained scope.
    pub async fn resume(&self) {
        let _ = self.cmd_tx.send(SupervisorCmd::Resume).await;
    }

    /// Unconditionally tear down the channel, clear the bound scope and
    /// cancel all timers. Idempotent.
    pub async fn cleanup(&self) {
        let (ack, ack_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(SupervisorCmd::Cleanup { ack })
            .await
            .is_ok()
        {
            let _ = ack_rx.await;
        }
    }

    /// Current connection state.
    pub fn state(&self) -> LinkState {
        *self.shared.state.read().unwrap()
    }

    /// The currently bound scope, if any.
    pub fn scope(&self) -> Option<String> {
        self.shared.scope.read().unwrap().clone()
    }

    /// The current subscription token (`0` before the first subscribe).
    pub fn current_token(&self) -> u64 {
        self.shared.token.load(Ordering::Relaxed)
    }

    /// Whether the channel is confirmed live.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Relaxed)
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        let _ = self.cmd_tx.try_send(SupervisorCmd::Shutdown);
    }
}

// ── Actor ───────────────────────────────────────────────────────────────────

struct ActiveChannel {
    name: String,
    pump: JoinHandle<()>,
    #[allow(dead_code)]
    created_at_ms: u64,
}

struct SupervisorActor {
    transport: Arc<dyn TransportProvider>,
    session: Arc<dyn SessionProvider>,
    bus: EventBus,
    timeouts: PulseLinkTimeouts,
    tokens: Arc<TokenCounter>,
    shared: Arc<SupervisorShared>,
    inbound_tx: mpsc::Sender<Inbound>,

    scope: Option<String>,
    token: u64,
    state: LinkState,
    channel: Option<ActiveChannel>,
    /// Automatic reconnects consumed in the current cycle.
    auto_attempts: u8,
    /// Reentrancy guard across the refresh/teardown/open suspension points.
    reconnect_in_flight: bool,
    paused: bool,
    /// Most recent failure status, drives the refresh-before-reconnect rule.
    last_failure: Option<ChannelStatus>,
    /// Confirmation/escalation deadline (one ladder step armed at a time).
    check_deadline: Option<Instant>,
    /// Optional autonomous retry deadline after the ladder is exhausted.
    retry_deadline: Option<Instant>,
}

impl SupervisorActor {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::Receiver<SupervisorCmd>,
        mut inbound_rx: mpsc::Receiver<Inbound>,
    ) {
        loop {
            let timer = sleep_until(self.next_deadline());
            tokio::pin!(timer);

            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let shutdown = match cmd {
                        Some(cmd) => self.handle_cmd(cmd).await,
                        None => true,
                    };
                    if shutdown {
                        self.teardown_channel().await;
                        return;
                    }
                }
                Some(inbound) = inbound_rx.recv() => {
                    self.handle_inbound(inbound).await;
                }
                _ = &mut timer => {
                    self.handle_deadlines().await;
                }
            }
        }
    }

    // ── command handling ───────────────────────────────────────────────

    /// Returns `true` when the actor should terminate.
    async fn handle_cmd(&mut self, cmd: SupervisorCmd) -> bool {
        match cmd {
            SupervisorCmd::Subscribe { scope, ack } => {
                self.handle_subscribe(scope).await;
                let _ = ack.send(());
            }
            SupervisorCmd::EnsureConnected => self.handle_ensure_connected().await,
            SupervisorCmd::Pause => self.handle_pause().await,
            SupervisorCmd::Resume => {
                if self.paused {
                    self.paused = false;
                    log::debug!("[pulse-link] resuming after pause");
                }
                self.handle_ensure_connected().await;
            }
            SupervisorCmd::Cleanup { ack } => {
                self.handle_cleanup().await;
                let _ = ack.send(());
            }
            SupervisorCmd::Shutdown => return true,
        }
        false
    }

    async fn handle_subscribe(&mut self, scope: String) {
        log::debug!("[pulse-link] rebinding supervisor to scope {}", scope);
        self.paused = false;
        self.auto_attempts = 0;
        self.last_failure = None;
        self.retry_deadline = None;

        self.advance_token();
        self.teardown_channel().await;

        self.scope = Some(scope.clone());
        *self.shared.scope.write().unwrap() = Some(scope);
        self.set_state(LinkState::Subscribing);

        self.open_channel().await;
        self.arm_check(self.timeouts.confirm_timeout);
    }

    async fn handle_ensure_connected(&mut self) {
        if self.paused {
            log::debug!("[pulse-link] warm check skipped while paused");
            return;
        }
        if self.scope.is_none() {
            log::debug!("[pulse-link] warm check with no bound scope");
            return;
        }
        if self.state == LinkState::Connected && self.channel.is_some() {
            // Duplicate subscription attempt: healthy, nothing to do.
            log::debug!("[pulse-link] warm check: already connected");
            return;
        }
        if self.reconnect_in_flight {
            return;
        }

        // External trigger starts a fresh bounded cycle; this reconnect is
        // the cycle's warm attempt.
        self.auto_attempts = 1;
        let refresh = matches!(self.last_failure, Some(ChannelStatus::ChannelError));
        self.cold_reconnect(refresh).await;
        self.arm_check(self.timeouts.escalate_timeout);
    }

    async fn handle_pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.teardown_channel().await;
        self.check_deadline = None;
        self.retry_deadline = None;
        self.set_state(LinkState::Unbound);
        log::info!(
            "[pulse-link] paused realtime channel (scope {:?} retained)",
            self.scope
        );
    }

    async fn handle_cleanup(&mut self) {
        self.teardown_channel().await;
        self.scope = None;
        *self.shared.scope.write().unwrap() = None;
        self.paused = false;
        self.auto_attempts = 0;
        self.last_failure = None;
        self.check_deadline = None;
        self.retry_deadline = None;
        self.set_state(LinkState::Unbound);
        log::debug!("[pulse-link] supervisor cleaned up");
    }

    // ── inbound handling ───────────────────────────────────────────────

    async fn handle_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Event { token, raw } => {
                if token != self.token {
                    // Expected filtering outcome, not an error.
                    log::debug!(
                        "[pulse-link] discarding stale event (token {}, current {})",
                        token,
                        self.token
                    );
                    return;
                }
                if let Some(scope) = &self.scope {
                    let envelope = EventEnvelope::from_raw(scope, raw, now_ms());
                    self.bus.publish(envelope);
                }
            }
            Inbound::Status { token, status } => {
                if token != self.token {
                    log::debug!(
                        "[pulse-link] discarding stale status {} (token {}, current {})",
                        status,
                        token,
                        self.token
                    );
                    return;
                }
                self.handle_status(status).await;
            }
        }
    }

    async fn handle_status(&mut self, status: ChannelStatus) {
        match status {
            ChannelStatus::Subscribed => {
                self.set_state(LinkState::Connected);
                self.auto_attempts = 0;
                self.last_failure = None;
                self.check_deadline = None;
                self.retry_deadline = None;
                log::info!(
                    "[pulse-link] channel confirmed for scope {:?} (token {})",
                    self.scope,
                    self.token
                );
            }
            ChannelStatus::TimedOut => {
                log::warn!(
                    "[pulse-link] provider reported TIMED_OUT for scope {:?}",
                    self.scope
                );
                self.last_failure = Some(ChannelStatus::TimedOut);
                self.set_state(LinkState::TimedOut);
                self.escalate().await;
            }
            ChannelStatus::ChannelError => {
                log::warn!(
                    "[pulse-link] provider reported CHANNEL_ERROR for scope {:?}",
                    self.scope
                );
                self.last_failure = Some(ChannelStatus::ChannelError);
                self.set_state(LinkState::ChannelError);
                if self.auto_attempts >= MAX_AUTO_ATTEMPTS {
                    self.report_unresolved();
                } else if !self.reconnect_in_flight {
                    // A channel error consumes all remaining automatic
                    // attempts: one refresh plus one re-creation, then wait.
                    self.auto_attempts = MAX_AUTO_ATTEMPTS;
                    self.cold_reconnect(true).await;
                    self.arm_check(self.timeouts.escalate_timeout);
                }
            }
            ChannelStatus::Closed => {
                log::warn!(
                    "[pulse-link] channel closed unexpectedly for scope {:?}",
                    self.scope
                );
                self.last_failure = Some(ChannelStatus::Closed);
                self.set_state(LinkState::ChannelError);
                self.escalate().await;
            }
        }
    }

    // ── timers ─────────────────────────────────────────────────────────

    fn next_deadline(&self) -> Instant {
        [self.check_deadline, self.retry_deadline]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
    }

    async fn handle_deadlines(&mut self) {
        let now = Instant::now();
        if self.check_deadline.is_some_and(|d| d <= now) {
            self.check_deadline = None;
            if self.state != LinkState::Connected {
                if self.state == LinkState::Subscribing {
                    // No status at all within the window.
                    self.set_state(LinkState::TimedOut);
                }
                self.escalate().await;
            }
        }
        if self.retry_deadline.is_some_and(|d| d <= now) {
            self.retry_deadline = None;
            self.handle_retry().await;
        }
    }

    async fn handle_retry(&mut self) {
        if self.paused || self.scope.is_none() || self.state == LinkState::Connected {
            return;
        }
        log::debug!(
            "[pulse-link] retry interval elapsed for scope {:?}, attempting recovery",
            self.scope
        );
        self.auto_attempts = 1;
        let refresh = matches!(self.last_failure, Some(ChannelStatus::ChannelError));
        self.cold_reconnect(refresh).await;
        self.arm_check(self.timeouts.escalate_timeout);
    }

    fn arm_check(&mut self, window: Duration) {
        self.check_deadline = Some(Instant::now() + window);
    }

    // ── escalation ladder ──────────────────────────────────────────────

    /// One step of the bounded warm→cold ladder.
    async fn escalate(&mut self) {
        if self.reconnect_in_flight {
            return;
        }
        let refresh = matches!(self.last_failure, Some(ChannelStatus::ChannelError));
        match self.auto_attempts {
            0 => {
                self.auto_attempts = 1;
                log::debug!(
                    "[pulse-link] confirmation window elapsed, running warm check for scope {:?}",
                    self.scope
                );
                self.cold_reconnect(refresh).await;
                self.arm_check(self.timeouts.escalate_timeout);
            }
            1 => {
                self.auto_attempts = 2;
                log::debug!(
                    "[pulse-link] still not confirmed, running cold reconnect for scope {:?}",
                    self.scope
                );
                self.cold_reconnect(refresh).await;
                self.arm_check(self.timeouts.escalate_timeout);
            }
            _ => self.report_unresolved(),
        }
    }

    /// Escalation exhausted: log, stop retrying, defer to external triggers.
    fn report_unresolved(&mut self) {
        log::warn!(
            "[pulse-link] automatic reconnect attempts exhausted for scope {:?} (state {:?}); waiting for external trigger",
            self.scope,
            self.state
        );
        if self.state == LinkState::Subscribing {
            self.set_state(LinkState::TimedOut);
        }
        self.check_deadline = None;
        if !PulseLinkTimeouts::is_no_timeout(self.timeouts.retry_interval) {
            self.retry_deadline = Some(Instant::now() + self.timeouts.retry_interval);
        }
    }

    /// Full teardown + re-creation under a fresh token, optionally preceded
    /// by a credential refresh.
    async fn cold_reconnect(&mut self, refresh: bool) {
        if self.reconnect_in_flight || self.scope.is_none() {
            return;
        }
        self.reconnect_in_flight = true;

        if refresh {
            match self.session.refresh_session().await {
                Ok(_) => log::debug!("[pulse-link] session refreshed before reconnect"),
                Err(e) => log::warn!(
                    "[pulse-link] session refresh failed: {}; reconnecting anyway",
                    e
                ),
            }
        }

        self.advance_token();
        self.teardown_channel().await;
        self.set_state(LinkState::Subscribing);
        self.open_channel().await;

        self.reconnect_in_flight = false;
    }

    // ── channel lifecycle ──────────────────────────────────────────────

    fn advance_token(&mut self) {
        self.token = self.tokens.next();
        self.shared.token.store(self.token, Ordering::Relaxed);
    }

    async fn open_channel(&mut self) {
        let scope = match &self.scope {
            Some(scope) => scope.clone(),
            None => return,
        };

        let connect = self.transport.subscribe(&scope, EventFilter::all());
        let result = if PulseLinkTimeouts::is_no_timeout(self.timeouts.connect_timeout) {
            Ok(connect.await)
        } else {
            tokio::time::timeout(self.timeouts.connect_timeout, connect).await
        };

        match result {
            Ok(Ok(handle)) => {
                let pump = spawn_pump(handle, self.token, self.inbound_tx.clone());
                self.channel = Some(ActiveChannel {
                    name: scope.clone(),
                    pump,
                    created_at_ms: now_ms(),
                });
                log::debug!(
                    "[pulse-link] channel open issued for scope {} (token {})",
                    scope,
                    self.token
                );
            }
            Ok(Err(e)) => {
                log::warn!(
                    "[pulse-link] transport open failed for scope {}: {}",
                    scope,
                    e
                );
                self.last_failure = Some(ChannelStatus::ChannelError);
                self.set_state(LinkState::ChannelError);
            }
            Err(_) => {
                log::warn!(
                    "[pulse-link] channel open timed out for scope {} after {:?}",
                    scope,
                    self.timeouts.connect_timeout
                );
                self.last_failure = Some(ChannelStatus::TimedOut);
                self.set_state(LinkState::TimedOut);
            }
        }
    }

    async fn teardown_channel(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.pump.abort();
            if let Err(e) = self.transport.unsubscribe(&channel.name).await {
                log::debug!(
                    "[pulse-link] unsubscribe failed for channel {}: {}",
                    channel.name,
                    e
                );
            }
        }
        self.shared.connected.store(false, Ordering::Relaxed);
    }

    fn set_state(&mut self, next: LinkState) {
        if self.state != next {
            log::debug!("[pulse-link] state {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        *self.shared.state.write().unwrap() = next;
        self.shared
            .connected
            .store(next == LinkState::Connected, Ordering::Relaxed);
    }
}

/// Forward a channel's events and status transitions into the actor,
/// tagged with the token captured at spawn. Dies when the handle closes,
/// the actor goes away, or the channel is torn down (abort).
fn spawn_pump(
    mut handle: TransportHandle,
    token: u64,
    inbound_tx: mpsc::Sender<Inbound>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = handle.events.recv() => match event {
                    Some(raw) => {
                        if inbound_tx.send(Inbound::Event { token, raw }).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                status = handle.status.recv() => match status {
                    Some(status) => {
                        let closed = status == ChannelStatus::Closed;
                        if inbound_tx
                            .send(Inbound::Status { token, status })
                            .await
                            .is_err()
                        {
                            break;
                        }
                        if closed {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    })
}
