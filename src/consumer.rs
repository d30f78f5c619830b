//! Stream consumer: drives one answer stream into the session store.
//!
//! `start` opens the HTTP stream, records the exchange in the store, and
//! spawns a task that applies events until completion, failure, or
//! cancellation. Cancellation is cooperative: `stop` fires a oneshot signal
//! that the task observes at its next stream read. An aborted stream is not
//! an error - the error callback fires only for genuine transport or backend
//! failures.
//!
//! At most one transport is active per consumer; `start` stops any prior
//! handle first. Between reads, event handling is synchronous, so chunk
//! processing steps for one handle never interleave.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::bridge::{BridgeEvent, StreamNotifier, CHUNK_NOTIFY_INTERVAL};
use crate::client::StreamClient;
use crate::error::StreamError;
use crate::events::StreamEvent;
use crate::models::StreamRequest;
use crate::store::SessionStore;

/// Lifecycle callbacks for one stream.
///
/// All hooks are optional. Payload-level JSON problems are recovered inside
/// the pipeline and never reach `on_error`.
#[derive(Default)]
pub struct StreamCallbacks {
    on_message: Option<Box<dyn Fn(&str) + Send + Sync>>,
    on_error: Option<Box<dyn Fn(&StreamError) + Send + Sync>>,
    on_complete: Option<Box<dyn Fn() + Send + Sync>>,
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every content chunk, with the cumulative text.
    pub fn on_message(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Box::new(f));
        self
    }

    /// Called once on transport or backend failure. Not called for
    /// cancellation.
    pub fn on_error(mut self, f: impl Fn(&StreamError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Called once on logical completion.
    pub fn on_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    fn message(&self, text: &str) {
        if let Some(cb) = &self.on_message {
            cb(text);
        }
    }

    fn error(&self, error: &StreamError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }

    fn complete(&self) {
        if let Some(cb) = &self.on_complete {
            cb();
        }
    }
}

/// One in-flight streaming request. Owns the cancellation capability.
pub struct StreamHandle {
    session_id: String,
    message_id: String,
    cancel: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl StreamHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Fire the cancellation signal and hand back the task for callers that
    /// want to await teardown.
    pub fn cancel(self) -> JoinHandle<()> {
        // The receiver also resolves when this sender is dropped, so an
        // abandoned handle cancels its task rather than leaking it.
        let _ = self.cancel.send(());
        self.task
    }
}

/// Drives answer streams into the session store and notification bridge.
pub struct StreamConsumer {
    client: Arc<StreamClient>,
    store: Arc<SessionStore>,
    bridge: Arc<dyn StreamNotifier>,
    active: Option<StreamHandle>,
}

impl StreamConsumer {
    pub fn new(
        client: Arc<StreamClient>,
        store: Arc<SessionStore>,
        bridge: Arc<dyn StreamNotifier>,
    ) -> Self {
        Self {
            client,
            store,
            bridge,
            active: None,
        }
    }

    /// Start streaming an answer for the request.
    ///
    /// Stops any prior in-flight handle first. Creates the exchange in the
    /// store, opens the transport, and spawns the consumption task. Returns
    /// the assistant message id.
    ///
    /// Connect-phase failures (missing credential, non-2xx, connection
    /// refused) are returned synchronously after the in-progress message has
    /// been transitioned to its error state; `on_error` is invoked for
    /// transport failures but not for the fail-fast credential check.
    pub async fn start(
        &mut self,
        request: StreamRequest,
        callbacks: StreamCallbacks,
    ) -> Result<String, StreamError> {
        self.stop();

        let session_id = request.session_id.clone();
        let message_id = self.store.begin_stream(&session_id, &request.question);
        self.bridge.emit(BridgeEvent::Started {
            session_id: session_id.clone(),
            message_id: message_id.clone(),
        });

        let stream = match self.client.stream(&request).await {
            Ok(stream) => stream,
            Err(error) => {
                self.store
                    .fail_stream(&session_id, &message_id, &error.to_string());
                self.bridge.emit(BridgeEvent::Failed {
                    session_id,
                    message_id,
                    error: error.to_string(),
                });
                if !matches!(error, StreamError::Auth { .. }) {
                    callbacks.error(&error);
                }
                return Err(error);
            }
        };

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let task = tokio::spawn(consume(
            stream,
            cancel_rx,
            Arc::clone(&self.store),
            Arc::clone(&self.bridge),
            callbacks,
            session_id.clone(),
            message_id.clone(),
        ));

        self.active = Some(StreamHandle {
            session_id,
            message_id: message_id.clone(),
            cancel: cancel_tx,
            task,
        });
        Ok(message_id)
    }

    /// Cancel the active stream, if any. Returns the task handle so callers
    /// can await teardown.
    pub fn stop(&mut self) -> Option<JoinHandle<()>> {
        self.active.take().map(StreamHandle::cancel)
    }

    /// The active handle, if a stream is in flight.
    pub fn active(&self) -> Option<&StreamHandle> {
        self.active.as_ref()
    }

    /// Wait for the active stream to finish naturally.
    pub async fn join(&mut self) {
        if let Some(handle) = self.active.take() {
            let _ = handle.task.await;
        }
    }
}

/// Consumption loop for one stream. The event stream (and with it the
/// response reader) is owned here and dropped on every exit path.
async fn consume(
    mut stream: crate::client::EventStream,
    mut cancel_rx: oneshot::Receiver<()>,
    store: Arc<SessionStore>,
    bridge: Arc<dyn StreamNotifier>,
    callbacks: StreamCallbacks,
    session_id: String,
    message_id: String,
) {
    let mut last_chunk_notify: Option<Instant> = None;

    loop {
        tokio::select! {
            // Cancellation wins when both are ready.
            biased;

            _ = &mut cancel_rx => {
                tracing::debug!(%session_id, %message_id, "stream cancelled");
                store.cancel_message(&session_id, &message_id);
                bridge.emit(BridgeEvent::Cancelled {
                    session_id,
                    message_id,
                });
                return;
            }

            item = stream.next() => match item {
                Some(Ok(StreamEvent::Content { text })) => {
                    store.apply_chunk(&session_id, &message_id, &text);
                    let due = last_chunk_notify
                        .map_or(true, |t| t.elapsed() >= CHUNK_NOTIFY_INTERVAL);
                    if due {
                        last_chunk_notify = Some(Instant::now());
                        bridge.emit(BridgeEvent::Chunk {
                            session_id: session_id.clone(),
                            message_id: message_id.clone(),
                        });
                    }
                    callbacks.message(&text);
                }
                Some(Ok(StreamEvent::Error { message })) => {
                    let error = StreamError::Backend { message };
                    store.fail_stream(&session_id, &message_id, &error.to_string());
                    bridge.emit(BridgeEvent::Failed {
                        session_id,
                        message_id,
                        error: error.to_string(),
                    });
                    callbacks.error(&error);
                    return;
                }
                Some(Err(error)) => {
                    store.fail_stream(&session_id, &message_id, &error.to_string());
                    bridge.emit(BridgeEvent::Failed {
                        session_id,
                        message_id,
                        error: error.to_string(),
                    });
                    callbacks.error(&error);
                    return;
                }
                // Sentinel or transport close: both complete the message.
                Some(Ok(StreamEvent::Done)) | None => {
                    store.complete_stream(&session_id, &message_id);
                    bridge.emit(BridgeEvent::Completed {
                        session_id,
                        message_id,
                    });
                    callbacks.complete();
                    return;
                }
            }
        }
    }
}
