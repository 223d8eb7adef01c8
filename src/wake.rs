//! Wake/visibility trigger.
//!
//! Bridges OS/browser signals (visibility, online, focus) into the
//! supervisor: wake-type signals are debounced into a single resume + warm
//! check, and a sustained Hidden signal pauses the channel after an idle
//! window so a backgrounded session stops holding a connection open.
//!
//! The signal source is just an `mpsc::Receiver<WakeSignal>`; the host
//! wires whatever platform events it has into it.

use crate::{supervisor::ConnectionSupervisor, timeouts::PulseLinkTimeouts};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Maximum sleep duration that won't overflow `Instant + Duration`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// A signal from the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeSignal {
    /// The app/tab became visible.
    Visible,
    /// The app/tab was hidden.
    Hidden,
    /// Network connectivity returned.
    Online,
    /// The window regained input focus.
    Focus,
}

/// Background task debouncing wake signals into supervisor calls.
pub struct WakeTrigger {
    task: JoinHandle<()>,
}

impl WakeTrigger {
    /// Spawn the trigger over a signal receiver.
    ///
    /// `Visible`/`Online`/`Focus` arm (and extend) a trailing-edge debounce
    /// window ending in one `resume()`; `Hidden` arms the idle-pause timer
    /// when `idle_pause` is enabled.
    pub fn spawn(
        signals: mpsc::Receiver<WakeSignal>,
        supervisor: Arc<ConnectionSupervisor>,
        timeouts: &PulseLinkTimeouts,
    ) -> Self {
        let debounce = timeouts.wake_debounce;
        let idle = timeouts.idle_pause;
        let task = tokio::spawn(wake_loop(signals, supervisor, debounce, idle));
        Self { task }
    }
}

impl Drop for WakeTrigger {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn wake_loop(
    mut signals: mpsc::Receiver<WakeSignal>,
    supervisor: Arc<ConnectionSupervisor>,
    debounce: Duration,
    idle: Duration,
) {
    let mut wake_deadline: Option<Instant> = None;
    let mut idle_deadline: Option<Instant> = None;

    loop {
        let next = [wake_deadline, idle_deadline]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or_else(|| Instant::now() + FAR_FUTURE);
        let timer = sleep_until(next);
        tokio::pin!(timer);

        tokio::select! {
            signal = signals.recv() => match signal {
                Some(WakeSignal::Hidden) => {
                    wake_deadline = None;
                    if !PulseLinkTimeouts::is_no_timeout(idle) {
                        idle_deadline = Some(Instant::now() + idle);
                        log::debug!("[pulse-link] hidden, idle timer armed");
                    }
                }
                Some(signal) => {
                    idle_deadline = None;
                    wake_deadline = Some(Instant::now() + debounce);
                    log::debug!("[pulse-link] wake signal {:?}, debouncing", signal);
                }
                None => return,
            },
            _ = &mut timer => {
                let now = Instant::now();
                if wake_deadline.is_some_and(|d| d <= now) {
                    wake_deadline = None;
                    log::debug!("[pulse-link] debounce elapsed, running warm check");
                    supervisor.resume().await;
                }
                if idle_deadline.is_some_and(|d| d <= now) {
                    idle_deadline = None;
                    log::debug!("[pulse-link] idle window elapsed, pausing channel");
                    supervisor.pause().await;
                }
            }
        }
    }
}
