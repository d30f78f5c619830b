//! Domain models for sessions, messages, and stream requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Lifecycle state of a message in the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Created when the question was submitted; no chunk received yet.
    Pending,
    /// At least one content chunk applied.
    Streaming,
    /// Stream finished normally.
    Complete,
    /// Stream failed or was cancelled; content holds the last partial text.
    Error,
}

/// A message in a session's ordered list.
///
/// Streaming messages are exclusively mutated by the session store on behalf
/// of the stream consumer; everything else observes them read-only through
/// store snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Client-generated message ID.
    pub id: String,
    /// ID of the session this message belongs to.
    pub session_id: String,
    /// Role of the sender.
    pub role: MessageRole,
    /// Message text. For a streaming assistant message this is the latest
    /// cumulative text received; each chunk replaces it.
    pub content: String,
    /// Lifecycle state.
    pub status: MessageStatus,
    /// Whether the message is currently being streamed.
    pub is_streaming: bool,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a completed user message carrying the submitted question.
    pub fn user(session_id: &str, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role: MessageRole::User,
            content,
            status: MessageStatus::Complete,
            is_streaming: false,
            created_at: Utc::now(),
        }
    }

    /// Create a pending assistant placeholder for an incoming stream.
    pub fn pending_assistant(session_id: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            role: MessageRole::Assistant,
            content: String::new(),
            status: MessageStatus::Pending,
            is_streaming: true,
            created_at: Utc::now(),
        }
    }
}

/// Parameters for one streaming request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRequest {
    /// The user's question.
    pub question: String,
    /// Session the answer belongs to.
    pub session_id: String,
    /// Ask the backend for simplified language.
    #[serde(default)]
    pub simple_language: bool,
}

impl StreamRequest {
    pub fn new(question: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: session_id.into(),
            simple_language: false,
        }
    }

    pub fn with_simple_language(mut self, simple_language: bool) -> Self {
        self.simple_language = simple_language;
        self
    }
}
