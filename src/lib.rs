//! docchat-stream - real-time answer streaming for the docchat assistant
//!
//! The pipeline: HTTP response bytes -> [`sse::FrameParser`] -> SSE frames
//! -> [`events::interpret`] -> domain events -> [`consumer::StreamConsumer`]
//! -> [`store::SessionStore`] snapshots -> subscribers.

pub mod auth;
pub mod bridge;
pub mod client;
pub mod config;
pub mod consumer;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod sse;
pub mod store;

pub use auth::{StaticTokenProvider, TokenProvider};
pub use bridge::{BridgeEvent, BroadcastBridge, NullBridge, StreamNotifier};
pub use client::StreamClient;
pub use config::StreamConfig;
pub use consumer::{StreamCallbacks, StreamConsumer, StreamHandle};
pub use error::StreamError;
pub use events::StreamEvent;
pub use models::{Message, MessageRole, MessageStatus, StreamRequest};
pub use store::{MessageList, SessionStore};
