//! Streaming-related error types.
//!
//! Errors are split along the failure taxonomy of the pipeline:
//! authentication (fails before any network call), transport (HTTP status or
//! connection), and in-band backend errors. A user-initiated stop is not an
//! error and has no variant here; it is surfaced through message state and
//! the notification bridge. Malformed payload JSON is never represented
//! here - it is recovered locally by falling back to literal text.

use std::fmt;

/// Stream pipeline error variants.
#[derive(Debug)]
pub enum StreamError {
    /// No bearer credential available; raised before any network I/O.
    Auth { message: String },

    /// Server responded with a non-2xx status.
    Server { status: u16, message: String },

    /// Network-level failure (connect, reset, body read).
    Http(reqwest::Error),

    /// Backend reported an error via the SSE payload.
    Backend { message: String },
}

impl StreamError {
    /// Short code for structured logging.
    pub fn error_code(&self) -> &'static str {
        match self {
            StreamError::Auth { .. } => "E_STREAM_AUTH",
            StreamError::Server { .. } => "E_STREAM_STATUS",
            StreamError::Http(_) => "E_STREAM_HTTP",
            StreamError::Backend { .. } => "E_STREAM_BACKEND",
        }
    }

    /// User-facing message for the error state shown on the message.
    pub fn user_message(&self) -> String {
        match self {
            StreamError::Auth { .. } => {
                "You are not signed in. Please sign in and try again.".to_string()
            }
            StreamError::Server { status, .. } => {
                format!("The server rejected the request (status {}).", status)
            }
            StreamError::Http(_) => {
                "Connection to the server was lost. Please try again.".to_string()
            }
            StreamError::Backend { message } => format!("Server error: {}", message),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Auth { message } => write!(f, "Authentication error: {}", message),
            StreamError::Server { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            StreamError::Http(e) => write!(f, "HTTP error: {}", e),
            StreamError::Backend { message } => write!(f, "Backend error: {}", message),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StreamError {
    fn from(e: reqwest::Error) -> Self {
        StreamError::Http(e)
    }
}
