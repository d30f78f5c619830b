//! Session message store with snapshot semantics.
//!
//! Holds the ordered message list per conversation session and applies the
//! streaming mutation protocol. Every mutation commits a fresh
//! `Arc<Vec<Arc<Message>>>` snapshot: both the mutated message and its
//! containing list get new identities on every chunk, so reference-diffing
//! observers always see either the pre-chunk or the post-chunk state in
//! full, never a torn intermediate. Snapshots are published per session on a
//! `watch` channel.
//!
//! Concurrency rule: at most one streaming writer per session. Beginning a
//! new stream finalizes any in-flight streaming message first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::models::{Message, MessageStatus};

/// Immutable snapshot of a session's ordered message list.
pub type MessageList = Arc<Vec<Arc<Message>>>;

struct SessionEntry {
    messages: MessageList,
    publisher: watch::Sender<MessageList>,
    /// Id of the assistant message currently receiving chunks, if any.
    active: Option<String>,
}

impl SessionEntry {
    fn new() -> Self {
        let messages: MessageList = Arc::new(Vec::new());
        let (publisher, _) = watch::channel(Arc::clone(&messages));
        Self {
            messages,
            publisher,
            active: None,
        }
    }

    /// Commit a new snapshot and publish it to subscribers.
    fn publish(&mut self, messages: Vec<Arc<Message>>) {
        self.messages = Arc::new(messages);
        // send_replace delivers even when no receiver is currently attached.
        self.publisher.send_replace(Arc::clone(&self.messages));
    }

    /// Rebuild the list with `message_id` replaced through `update`.
    ///
    /// Returns false when the message is not present.
    fn replace_message<F>(&mut self, message_id: &str, update: F) -> bool
    where
        F: FnOnce(&Message) -> Message,
    {
        let Some(index) = self.messages.iter().position(|m| m.id == message_id) else {
            return false;
        };
        let mut next: Vec<Arc<Message>> = self.messages.as_ref().clone();
        next[index] = Arc::new(update(&next[index]));
        self.publish(next);
        true
    }

    /// Finalize the active streaming message as an error, preserving its
    /// partial content.
    fn finalize_active(&mut self) {
        if let Some(active_id) = self.active.take() {
            self.replace_message(&active_id, |old| {
                let mut message = old.clone();
                message.status = MessageStatus::Error;
                message.is_streaming = false;
                message
            });
        }
    }
}

/// Per-session message store shared between the stream consumer (writer) and
/// UI observers (readers).
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        // A poisoned map only means a writer panicked mid-commit; snapshots
        // are swapped atomically, so the data is still consistent.
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Begin a streaming exchange: append the user question and a pending
    /// assistant message, and return the assistant message id.
    ///
    /// If the session already has an in-flight streaming message it is
    /// finalized (error state, partial content preserved) before the new
    /// exchange is created, keeping a single writer per session.
    pub fn begin_stream(&self, session_id: &str, question: &str) -> String {
        let mut sessions = self.lock();
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::new);

        if entry.active.is_some() {
            tracing::debug!(session_id, "finalizing prior in-flight stream");
            entry.finalize_active();
        }

        let user = Message::user(session_id, question.to_string());
        let assistant = Message::pending_assistant(session_id);
        let assistant_id = assistant.id.clone();

        let mut next: Vec<Arc<Message>> = entry.messages.as_ref().clone();
        next.push(Arc::new(user));
        next.push(Arc::new(assistant));
        entry.publish(next);
        entry.active = Some(assistant_id.clone());

        assistant_id
    }

    /// Apply a content chunk to the in-flight message.
    ///
    /// The chunk REPLACES the message content: the backend streams the
    /// cumulative answer-so-far, not deltas. Publishes a fresh snapshot.
    pub fn apply_chunk(&self, session_id: &str, message_id: &str, text: &str) {
        let mut sessions = self.lock();
        let Some(entry) = sessions.get_mut(session_id) else {
            tracing::warn!(session_id, "chunk for unknown session dropped");
            return;
        };
        let replaced = entry.replace_message(message_id, |old| {
            let mut message = old.clone();
            message.content = text.to_string();
            message.status = MessageStatus::Streaming;
            message.is_streaming = true;
            message
        });
        if !replaced {
            tracing::warn!(session_id, message_id, "chunk for unknown message dropped");
        }
    }

    /// Mark the message complete. Content stays at the last applied chunk.
    pub fn complete_stream(&self, session_id: &str, message_id: &str) {
        let mut sessions = self.lock();
        let Some(entry) = sessions.get_mut(session_id) else {
            return;
        };
        entry.replace_message(message_id, |old| {
            let mut message = old.clone();
            message.status = MessageStatus::Complete;
            message.is_streaming = false;
            message
        });
        if entry.active.as_deref() == Some(message_id) {
            entry.active = None;
        }
    }

    /// Mark the message failed. Partial content is preserved so the user
    /// keeps whatever was received.
    pub fn fail_stream(&self, session_id: &str, message_id: &str, error: &str) {
        tracing::warn!(session_id, message_id, error, "stream failed");
        let mut sessions = self.lock();
        let Some(entry) = sessions.get_mut(session_id) else {
            return;
        };
        entry.replace_message(message_id, |old| {
            let mut message = old.clone();
            message.status = MessageStatus::Error;
            message.is_streaming = false;
            message
        });
        if entry.active.as_deref() == Some(message_id) {
            entry.active = None;
        }
    }

    /// Cancel the session's in-flight stream, if any. The message freezes at
    /// its last partial content in error state.
    pub fn cancel_stream(&self, session_id: &str) {
        let mut sessions = self.lock();
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.finalize_active();
        }
    }

    /// Cancel a specific message. Used by the consumer's cooperative-cancel
    /// path: targeting the message id means a stale handle can never
    /// finalize a newer stream that has since taken over the session.
    pub fn cancel_message(&self, session_id: &str, message_id: &str) {
        let mut sessions = self.lock();
        let Some(entry) = sessions.get_mut(session_id) else {
            return;
        };
        entry.replace_message(message_id, |old| {
            let mut message = old.clone();
            message.status = MessageStatus::Error;
            message.is_streaming = false;
            message
        });
        if entry.active.as_deref() == Some(message_id) {
            entry.active = None;
        }
    }

    /// Current snapshot of a session's messages.
    pub fn messages(&self, session_id: &str) -> MessageList {
        let sessions = self.lock();
        sessions
            .get(session_id)
            .map(|entry| Arc::clone(&entry.messages))
            .unwrap_or_default()
    }

    /// Subscribe to snapshot updates for a session. Creates the session
    /// entry if it does not exist yet.
    pub fn subscribe(&self, session_id: &str) -> watch::Receiver<MessageList> {
        let mut sessions = self.lock();
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(SessionEntry::new);
        entry.publisher.subscribe()
    }

    /// Whether the session has an in-flight streaming message.
    pub fn is_streaming(&self, session_id: &str) -> bool {
        let sessions = self.lock();
        sessions
            .get(session_id)
            .map(|entry| entry.active.is_some())
            .unwrap_or(false)
    }
}
