//! Handler sets for registry-managed scopes.
//!
//! Multiple components can register interest in the same scope; their
//! handler sets accumulate and a single channel serves them all. Handlers
//! are keyed by [`Topic`] so one multiplexed channel fans out to exactly
//! the callbacks that asked for that stream.
//!
//! # Example
//!
//! ```rust
//! use pulse_link::{ScopeHandlers, Topic};
//!
//! let handlers = ScopeHandlers::new()
//!     .on_conversations(|event| {
//!         println!("conversation change: {:?}", event.kind);
//!     })
//!     .on(Topic::Documents, |event| {
//!         println!("document change: {:?}", event.kind);
//!     });
//! assert!(handlers.has_any());
//! ```

use crate::models::{EventEnvelope, Topic};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with every matching envelope.
pub type EventCallback = Arc<dyn Fn(&EventEnvelope) + Send + Sync>;

/// A topic-keyed set of event callbacks for one registration.
#[derive(Clone, Default)]
pub struct ScopeHandlers {
    callbacks: HashMap<Topic, Vec<EventCallback>>,
}

impl ScopeHandlers {
    /// Create an empty handler set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one topic.
    pub fn on(mut self, topic: Topic, f: impl Fn(&EventEnvelope) + Send + Sync + 'static) -> Self {
        self.callbacks.entry(topic).or_default().push(Arc::new(f));
        self
    }

    /// Register a callback for conversation changes.
    pub fn on_conversations(self, f: impl Fn(&EventEnvelope) + Send + Sync + 'static) -> Self {
        self.on(Topic::Conversations, f)
    }

    /// Register a callback for document changes.
    pub fn on_documents(self, f: impl Fn(&EventEnvelope) + Send + Sync + 'static) -> Self {
        self.on(Topic::Documents, f)
    }

    /// Returns `true` if any callback is registered.
    pub fn has_any(&self) -> bool {
        self.callbacks.values().any(|v| !v.is_empty())
    }

    /// Invoke every callback registered for the envelope's topic.
    pub(crate) fn dispatch(&self, envelope: &EventEnvelope) {
        if let Some(callbacks) = self.callbacks.get(&envelope.topic) {
            for callback in callbacks {
                callback(envelope);
            }
        }
    }
}

impl fmt::Debug for ScopeHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&Topic, usize> =
            self.callbacks.iter().map(|(t, v)| (t, v.len())).collect();
        f.debug_struct("ScopeHandlers")
            .field("callbacks", &counts)
            .finish()
    }
}
