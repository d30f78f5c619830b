//! Error types for the streaming pipeline.

mod stream;

pub use stream::StreamError;
