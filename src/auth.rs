//! Bearer credential provider abstraction.
//!
//! Token acquisition and refresh live outside this crate; the stream client
//! only needs a way to ask "what bearer token do I send right now?". The
//! trait keeps the client testable and lets the host application plug in its
//! own token management.

use async_trait::async_trait;

/// Supplies the bearer credential for stream requests.
///
/// Returning `None` means no credential is available; the client then fails
/// fast with an authentication error before any network call.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// Fixed-token provider for tests and simple deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    /// Provider that always returns the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Provider with no credential, for exercising the fail-fast path.
    pub fn empty() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }
}
