//! Timeout configuration for pulse-link client operations.
//!
//! Provides centralized timer-window management for channel confirmation,
//! reconnect escalation, wake debouncing, and idle pausing.

use std::time::Duration;

/// Timer windows for pulse-link client operations.
///
/// All values have sensible defaults; the zero duration means "disabled"
/// for the optional windows (`idle_pause`, `retry_interval`).
///
/// # Examples
///
/// ```rust
/// use pulse_link::PulseLinkTimeouts;
/// use std::time::Duration;
///
/// // Use defaults (recommended for most cases)
/// let timeouts = PulseLinkTimeouts::default();
///
/// // Custom windows for a high-latency environment
/// let timeouts = PulseLinkTimeouts::builder()
///     .connect_timeout(Duration::from_secs(30))
///     .confirm_timeout_ms(5000)
///     .build();
///
/// // Aggressive windows for local development
/// let timeouts = PulseLinkTimeouts::fast();
/// ```
#[derive(Debug, Clone)]
pub struct PulseLinkTimeouts {
    /// Bound on a single transport channel-open call.
    /// Default: 10 seconds
    pub connect_timeout: Duration,

    /// Confirmation window: time allowed between issuing a subscribe and
    /// the provider reporting SUBSCRIBED before a warm check runs.
    /// Default: 2000 ms
    pub confirm_timeout: Duration,

    /// Escalation window armed after each automatic reconnect attempt;
    /// when it elapses without a confirmation the next (bounded) step of
    /// the escalation ladder runs.
    /// Default: 600 ms
    pub escalate_timeout: Duration,

    /// Debounce window applied to wake signals (visibility/online/focus)
    /// before a single warm check is issued.
    /// Default: 250 ms
    pub wake_debounce: Duration,

    /// Idle window after a Hidden signal before the supervisor channel is
    /// paused (torn down with the bound scope retained).
    /// Set to 0 to disable. Default: 5 minutes
    pub idle_pause: Duration,

    /// Autonomous retry interval once automatic reconnect attempts are
    /// exhausted. The default (0, disabled) preserves the
    /// wait-for-external-trigger behavior; hosts wanting unattended
    /// foreground recovery opt in.
    pub retry_interval: Duration,
}

impl Default for PulseLinkTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            confirm_timeout: Duration::from_millis(2000),
            escalate_timeout: Duration::from_millis(600),
            wake_debounce: Duration::from_millis(250),
            idle_pause: Duration::from_secs(5 * 60),
            retry_interval: Duration::ZERO, // Disabled by default
        }
    }
}

impl PulseLinkTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> PulseLinkTimeoutsBuilder {
        PulseLinkTimeoutsBuilder::new()
    }

    /// Windows optimized for fast local development and tests.
    pub fn fast() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            confirm_timeout: Duration::from_millis(500),
            escalate_timeout: Duration::from_millis(200),
            wake_debounce: Duration::from_millis(50),
            idle_pause: Duration::from_secs(30),
            retry_interval: Duration::ZERO,
        }
    }

    /// Windows optimized for high-latency or unreliable networks.
    pub fn relaxed() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            confirm_timeout: Duration::from_millis(8000),
            escalate_timeout: Duration::from_millis(2000),
            wake_debounce: Duration::from_millis(500),
            idle_pause: Duration::from_secs(10 * 60),
            retry_interval: Duration::ZERO,
        }
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365) // > 1 year
    }
}

/// Builder for creating custom [`PulseLinkTimeouts`] configurations.
#[derive(Debug, Clone)]
pub struct PulseLinkTimeoutsBuilder {
    timeouts: PulseLinkTimeouts,
}

impl PulseLinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: PulseLinkTimeouts::default(),
        }
    }

    /// Set the bound on a single transport channel-open call.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect_timeout = timeout;
        self
    }

    /// Set the channel-open bound in milliseconds.
    pub fn connect_timeout_ms(self, ms: u64) -> Self {
        self.connect_timeout(Duration::from_millis(ms))
    }

    /// Set the confirmation window (subscribe → SUBSCRIBED).
    pub fn confirm_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.confirm_timeout = timeout;
        self
    }

    /// Set the confirmation window in milliseconds.
    pub fn confirm_timeout_ms(self, ms: u64) -> Self {
        self.confirm_timeout(Duration::from_millis(ms))
    }

    /// Set the escalation window armed after each reconnect attempt.
    pub fn escalate_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.escalate_timeout = timeout;
        self
    }

    /// Set the escalation window in milliseconds.
    pub fn escalate_timeout_ms(self, ms: u64) -> Self {
        self.escalate_timeout(Duration::from_millis(ms))
    }

    /// Set the wake-signal debounce window.
    pub fn wake_debounce(mut self, window: Duration) -> Self {
        self.timeouts.wake_debounce = window;
        self
    }

    /// Set the wake-signal debounce window in milliseconds.
    pub fn wake_debounce_ms(self, ms: u64) -> Self {
        self.wake_debounce(Duration::from_millis(ms))
    }

    /// Set the hidden→pause idle window. Set to 0 to disable.
    pub fn idle_pause(mut self, window: Duration) -> Self {
        self.timeouts.idle_pause = window;
        self
    }

    /// Set the hidden→pause idle window in seconds. Set to 0 to disable.
    pub fn idle_pause_secs(self, secs: u64) -> Self {
        self.idle_pause(Duration::from_secs(secs))
    }

    /// Set the autonomous retry interval. Set to 0 to disable (default).
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.timeouts.retry_interval = interval;
        self
    }

    /// Set the autonomous retry interval in seconds. Set to 0 to disable.
    pub fn retry_interval_secs(self, secs: u64) -> Self {
        self.retry_interval(Duration::from_secs(secs))
    }

    /// Build the timeout configuration.
    pub fn build(self) -> PulseLinkTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = PulseLinkTimeouts::default();
        assert_eq!(timeouts.connect_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.confirm_timeout, Duration::from_millis(2000));
        assert_eq!(timeouts.escalate_timeout, Duration::from_millis(600));
        assert_eq!(timeouts.wake_debounce, Duration::from_millis(250));
        assert!(timeouts.retry_interval.is_zero());
    }

    #[test]
    fn test_builder() {
        let timeouts = PulseLinkTimeouts::builder()
            .confirm_timeout_ms(5000)
            .escalate_timeout_ms(1500)
            .retry_interval_secs(60)
            .build();

        assert_eq!(timeouts.confirm_timeout, Duration::from_millis(5000));
        assert_eq!(timeouts.escalate_timeout, Duration::from_millis(1500));
        assert_eq!(timeouts.retry_interval, Duration::from_secs(60));
        // untouched fields keep their defaults
        assert_eq!(timeouts.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_fast_preset() {
        let timeouts = PulseLinkTimeouts::fast();
        assert!(timeouts.connect_timeout <= Duration::from_secs(5));
        assert!(timeouts.confirm_timeout <= Duration::from_millis(2000));
    }

    #[test]
    fn test_relaxed_preset() {
        let timeouts = PulseLinkTimeouts::relaxed();
        assert!(timeouts.connect_timeout >= Duration::from_secs(30));
        assert!(timeouts.confirm_timeout >= Duration::from_millis(2000));
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(PulseLinkTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!PulseLinkTimeouts::is_no_timeout(Duration::from_secs(1)));
        assert!(!PulseLinkTimeouts::is_no_timeout(Duration::from_secs(3600)));
    }
}
