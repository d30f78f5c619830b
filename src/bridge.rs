//! Cross-runtime notification bridge.
//!
//! Lets non-reactive parts of the host application observe stream lifecycle
//! events without importing the session store. The bridge is a notification
//! side-channel, not a data path: the consumer emits best-effort and never
//! depends on delivery for its own correctness. The bridge is injected into
//! the consumer rather than reached through a global.

use std::time::Duration;

use tokio::sync::broadcast;

/// Stream lifecycle notification.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeEvent {
    /// A stream started for the session.
    Started {
        session_id: String,
        message_id: String,
    },
    /// A content chunk was applied. Rate-limited by the consumer.
    Chunk {
        session_id: String,
        message_id: String,
    },
    /// The stream completed normally.
    Completed {
        session_id: String,
        message_id: String,
    },
    /// The stream failed.
    Failed {
        session_id: String,
        message_id: String,
        error: String,
    },
    /// The stream was cancelled by the caller.
    Cancelled {
        session_id: String,
        message_id: String,
    },
}

impl BridgeEvent {
    /// Event name for logging and loosely-typed subscribers.
    pub fn name(&self) -> &'static str {
        match self {
            BridgeEvent::Started { .. } => "stream:started",
            BridgeEvent::Chunk { .. } => "stream:chunk",
            BridgeEvent::Completed { .. } => "stream:completed",
            BridgeEvent::Failed { .. } => "stream:failed",
            BridgeEvent::Cancelled { .. } => "stream:cancelled",
        }
    }
}

/// Publish surface the stream consumer emits lifecycle events on.
pub trait StreamNotifier: Send + Sync {
    /// Emit an event. Must not block and must not fail the caller.
    fn emit(&self, event: BridgeEvent);
}

/// Broadcast-backed bridge for in-process subscribers.
pub struct BroadcastBridge {
    sender: broadcast::Sender<BridgeEvent>,
}

/// Minimum spacing between per-chunk bridge notifications.
pub const CHUNK_NOTIFY_INTERVAL: Duration = Duration::from_millis(100);

impl BroadcastBridge {
    /// Create a bridge with the given subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to lifecycle events. Slow subscribers that fall more than
    /// the buffer capacity behind skip missed events.
    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastBridge {
    fn default() -> Self {
        Self::new(64)
    }
}

impl StreamNotifier for BroadcastBridge {
    fn emit(&self, event: BridgeEvent) {
        tracing::debug!(event = event.name(), "bridge emit");
        // Err means no subscriber is attached; that is fine.
        let _ = self.sender.send(event);
    }
}

/// Bridge that drops everything, for callers that do not observe.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBridge;

impl StreamNotifier for NullBridge {
    fn emit(&self, _event: BridgeEvent) {}
}
