//! Shared subscription-token counter and time helpers.
//!
//! Every live channel is tagged with a token drawn from one process-wide
//! monotonic counter. Pump tasks capture the token at spawn; events and
//! status updates carrying a token older than the scope's current one are
//! discarded, which is what makes rapid rebinds race-free.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-wide monotonic subscription-token source.
///
/// Tokens strictly increase and never reset for the lifetime of the
/// process. Token `0` is reserved as "no channel yet".
#[derive(Debug, Default)]
pub struct TokenCounter(AtomicU64);

impl TokenCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the next token. The first call returns `1`.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// The most recently issued token (`0` if none yet).
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Current time in millis since Unix epoch.
pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
