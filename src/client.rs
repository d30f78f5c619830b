//! HTTP client for the answer streaming endpoint.
//!
//! Issues the authorized GET against the backend's SSE endpoint and exposes
//! the response body as a stream of domain events. Framing is handled by
//! [`FrameParser`]; payload interpretation by [`crate::events::interpret`].
//!
//! The returned stream terminates on the logical completion sentinel without
//! waiting for the transport to close. The response reader lives inside the
//! stream state and is dropped on every exit path, so no reader is leaked on
//! completion, error, or cancellation.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::stream::{self, Stream};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;

use crate::auth::TokenProvider;
use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::events::{interpret, StreamEvent};
use crate::models::StreamRequest;
use crate::sse::{FrameParser, SseMessage};

/// Stream of domain events produced from one HTTP response.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, StreamError>> + Send>>;

/// Client for the streaming question endpoint.
pub struct StreamClient {
    config: StreamConfig,
    token_provider: Arc<dyn TokenProvider>,
    client: Client,
}

impl StreamClient {
    /// Create a client for the given backend with an injected credential
    /// source.
    pub fn new(config: StreamConfig, token_provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            config,
            token_provider,
            client: Client::new(),
        }
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Open the streaming request and return the event stream.
    ///
    /// Fails with [`StreamError::Auth`] before any network call when no
    /// bearer credential is available, and with [`StreamError::Server`] on a
    /// non-2xx status. Retry policy is a caller concern.
    pub async fn stream(&self, request: &StreamRequest) -> Result<EventStream, StreamError> {
        let token =
            self.token_provider
                .bearer_token()
                .await
                .ok_or_else(|| StreamError::Auth {
                    message: "no bearer token available".to_string(),
                })?;

        let url = build_stream_url(&self.config, request);
        tracing::debug!(session_id = %request.session_id, "opening answer stream");

        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::warn!(status, "stream request rejected");
            return Err(StreamError::Server { status, message });
        }

        let bytes_stream = response.bytes_stream();

        // Unfold over (reader, parser, parsed-but-undelivered frames,
        // eof-seen, logically-done). The parser is created per stream, so
        // concurrent streams can never share a buffer.
        let event_stream = stream::unfold(
            StreamState {
                bytes_stream: Box::pin(bytes_stream),
                parser: FrameParser::new(),
                decode_buf: Vec::new(),
                queue: VecDeque::new(),
                eof: false,
                done: false,
            },
            |mut state| async move {
                loop {
                    if state.done {
                        return None;
                    }

                    if let Some(message) = state.queue.pop_front() {
                        match interpret(&message) {
                            Some(StreamEvent::Done) => {
                                // Logical completion: stop consuming even if
                                // the transport still has bytes.
                                state.done = true;
                                tracing::debug!("stream completed via sentinel");
                                return Some((Ok(StreamEvent::Done), state));
                            }
                            Some(event) => return Some((Ok(event), state)),
                            None => continue,
                        }
                    }

                    if state.eof {
                        return None;
                    }

                    match state.bytes_stream.next().await {
                        Some(Ok(chunk)) => {
                            // Transport chunks can split a multibyte
                            // character; decode only up to the last complete
                            // UTF-8 boundary and carry the tail over.
                            state.decode_buf.extend_from_slice(&chunk);
                            let text = drain_valid_utf8(&mut state.decode_buf);
                            if !text.is_empty() {
                                state.queue.extend(state.parser.parse_chunk(&text));
                            }
                        }
                        Some(Err(e)) => {
                            state.done = true;
                            return Some((Err(StreamError::Http(e)), state));
                        }
                        None => {
                            // Transport closed; flush any unterminated
                            // trailing frame before ending.
                            state.eof = true;
                            if let Some(message) = state.parser.finish() {
                                state.queue.push_back(message);
                            }
                        }
                    }
                }
            },
        );

        Ok(Box::pin(event_stream))
    }
}

struct StreamState {
    bytes_stream: Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
    parser: FrameParser,
    /// Bytes received but not yet decodable as complete UTF-8.
    decode_buf: Vec<u8>,
    queue: VecDeque<SseMessage>,
    eof: bool,
    done: bool,
}

/// Take the longest decodable UTF-8 prefix out of the buffer.
///
/// A trailing incomplete multibyte sequence stays in the buffer until the
/// next chunk completes it. Invalid sequences are skipped so a corrupt byte
/// cannot stall the stream.
fn drain_valid_utf8(buffer: &mut Vec<u8>) -> String {
    let mut text = String::new();
    loop {
        match std::str::from_utf8(buffer) {
            Ok(valid) => {
                text.push_str(valid);
                buffer.clear();
                break;
            }
            Err(e) => {
                let valid_to = e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&buffer[..valid_to]));
                match e.error_len() {
                    Some(invalid) => {
                        buffer.drain(..valid_to + invalid);
                    }
                    None => {
                        buffer.drain(..valid_to);
                        break;
                    }
                }
            }
        }
    }
    text
}

/// Build the GET URL with encoded query parameters.
fn build_stream_url(config: &StreamConfig, request: &StreamRequest) -> String {
    let mut url = format!(
        "{}?question={}&session_id={}",
        config.stream_url(),
        urlencoding::encode(&request.question),
        urlencoding::encode(&request.session_id),
    );
    if request.simple_language || config.simple_language {
        url.push_str("&simple_language=true");
    }
    url
}
