//! Domain events carried by the answer stream.
//!
//! Maps parsed SSE frames onto the events the rest of the pipeline acts on.
//! The backend conventionally sends `data` as a JSON object with either a
//! `content` or an `error` field; non-JSON payloads are accepted as literal
//! text so a malformed frame never aborts the stream.

use serde::Deserialize;

use crate::sse::SseMessage;

/// Sentinel payload signalling logical completion independent of transport
/// closure.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A domain-level event produced from one SSE frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Answer text for the in-flight message. The server sends cumulative
    /// text, so each chunk replaces the previous content.
    Content { text: String },
    /// Backend-reported error delivered in-band.
    Error { message: String },
    /// Logical end of the stream.
    Done,
}

/// Payload shape for `data` JSON objects: `content` carries answer text,
/// `error` an in-band failure message. Anything else falls through to the
/// literal-text treatment below.
#[derive(Debug, Deserialize)]
struct AnswerPayload {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Interpret a parsed SSE frame as a domain event.
///
/// Returns `None` for frames that carry nothing actionable (no data and no
/// recognized event name), e.g. keep-alive frames with only an `id` field.
pub fn interpret(message: &SseMessage) -> Option<StreamEvent> {
    if message.event_name() == "done" {
        return Some(StreamEvent::Done);
    }

    let data = message.data.as_deref()?;
    if data == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<AnswerPayload>(data) {
        Ok(payload) => {
            if let Some(message) = payload.error {
                return Some(StreamEvent::Error { message });
            }
            if let Some(content) = payload.content {
                return Some(StreamEvent::Content { text: content });
            }
            // Valid JSON without recognized fields: fall through to the
            // literal-text treatment so nothing is silently lost.
            tracing::debug!("SSE payload without content/error field: {}", data);
            Some(StreamEvent::Content {
                text: data.to_string(),
            })
        }
        Err(_) => Some(StreamEvent::Content {
            text: data.to_string(),
        }),
    }
}
