//! SSE (Server-Sent Events) frame parser
//!
//! Parses the SSE wire format delivered over a chunked HTTP response.
//! SSE frames consist of:
//! - `field: value` lines (`event`, `data`, `id`, `retry`)
//! - A blank line - frame terminator
//! - Lines starting with `:` - comments (ignored)
//!
//! The parser owns its buffer: chunks may split frames at arbitrary byte
//! boundaries and the trailing partial frame is carried over to the next
//! `parse_chunk` call. One parser instance serves exactly one stream.

/// A complete SSE frame as received from the backend.
///
/// A message is only produced once its terminating blank line has been
/// observed; partial frames are never emitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SseMessage {
    /// Optional event name (`event:` field). Semantically defaults to
    /// "message" when absent.
    pub event: Option<String>,
    /// Payload (`data:` field). Multiple `data:` lines in one frame are
    /// joined with `\n` in encounter order.
    pub data: Option<String>,
    /// Optional last-event-id (`id:` field).
    pub id: Option<String>,
    /// Optional reconnection hint in milliseconds (`retry:` field).
    /// Informational only; the stream client does not act on it.
    pub retry: Option<u64>,
}

impl SseMessage {
    /// Effective event name, defaulting to "message" per the SSE spec.
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }
}

/// Incremental SSE frame parser.
///
/// Feeds arbitrarily-chunked text through an internal buffer and emits
/// complete frames in arrival order. After `parse_chunk` returns, the buffer
/// holds at most one partial (not-yet-terminated) frame.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: String,
}

impl FrameParser {
    /// Create a new frame parser with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of text and return every frame completed by it.
    ///
    /// The buffer (previous leftover plus this chunk) is split on the
    /// `"\n\n"` frame separator. The last segment may be incomplete and is
    /// retained; all preceding segments are parsed as complete frames.
    pub fn parse_chunk(&mut self, chunk: &str) -> Vec<SseMessage> {
        self.buffer.push_str(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.find("\n\n") {
            let frame = self.buffer[..pos].to_string();
            self.buffer.drain(..pos + 2);
            if let Some(message) = parse_frame(&frame) {
                messages.push(message);
            }
        }
        messages
    }

    /// Flush the buffer at end of transport.
    ///
    /// The underlying connection closed without terminating the final frame;
    /// treat the leftover as a terminated frame. A leftover with no
    /// recognized fields yields `None` and is discarded.
    pub fn finish(&mut self) -> Option<SseMessage> {
        if self.buffer.is_empty() {
            return None;
        }
        let frame = std::mem::take(&mut self.buffer);
        parse_frame(&frame)
    }

    /// Clear the buffer and any partial frame. Used when a new stream
    /// handle begins.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Whether a partial frame is waiting for more data.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }
}

/// Parse one complete frame into a message.
///
/// Returns `None` when the frame sets no recognized field (e.g. it consisted
/// only of comments or unknown fields).
fn parse_frame(frame: &str) -> Option<SseMessage> {
    let mut message = SseMessage::default();
    let mut data_lines: Vec<&str> = Vec::new();
    let mut seen_field = false;

    for line in frame.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let Some((field, value)) = split_field(line) else {
            // A line with no colon carries no field.
            continue;
        };
        match field {
            "event" => {
                message.event = Some(value.to_string());
                seen_field = true;
            }
            "data" => {
                data_lines.push(value);
                seen_field = true;
            }
            "id" => {
                message.id = Some(value.to_string());
                seen_field = true;
            }
            "retry" => {
                // Parse failure leaves the field unset rather than raising.
                if let Ok(ms) = value.trim().parse::<u64>() {
                    message.retry = Some(ms);
                }
                seen_field = true;
            }
            _ => {
                // Unknown fields are ignored.
            }
        }
    }

    if !seen_field {
        return None;
    }
    if !data_lines.is_empty() {
        message.data = Some(data_lines.join("\n"));
    }
    Some(message)
}

/// Split a `field:value` line, stripping the single optional space after the
/// colon per the SSE spec.
fn split_field(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    let field = &line[..colon];
    let rest = &line[colon + 1..];
    let value = rest.strip_prefix(' ').unwrap_or(rest);
    Some((field, value))
}
