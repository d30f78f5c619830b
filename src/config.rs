//! Configuration for the stream client.

use serde::{Deserialize, Serialize};

/// Default backend base URL; overridden per deployment.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default path of the streaming endpoint.
pub const DEFAULT_STREAM_ENDPOINT: &str = "/api/question/stream";

/// Client configuration.
///
/// Deserializable so deployments can ship it inside a larger config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Base URL of the backend, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the SSE streaming endpoint.
    #[serde(default = "default_stream_endpoint")]
    pub stream_endpoint: String,
    /// Request simplified language by default.
    #[serde(default)]
    pub simple_language: bool,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_stream_endpoint() -> String {
    DEFAULT_STREAM_ENDPOINT.to_string()
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            stream_endpoint: default_stream_endpoint(),
            simple_language: false,
        }
    }
}

impl StreamConfig {
    /// Config pointing at a specific backend.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Full URL of the streaming endpoint.
    pub fn stream_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.stream_endpoint
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.stream_endpoint, DEFAULT_STREAM_ENDPOINT);
        assert!(!config.simple_language);
    }

    #[test]
    fn test_stream_url_joins_without_double_slash() {
        let config = StreamConfig::with_base_url("http://host:9000/");
        assert_eq!(config.stream_url(), "http://host:9000/api/question/stream");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: StreamConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(config, StreamConfig::default());
    }

    #[test]
    fn test_deserialize_overrides() {
        let config: StreamConfig = serde_json::from_str(
            r#"{"base_url": "https://dms.example", "simple_language": true}"#,
        )
        .expect("deserialize");
        assert_eq!(config.base_url, "https://dms.example");
        assert!(config.simple_language);
        assert_eq!(config.stream_endpoint, DEFAULT_STREAM_ENDPOINT);
    }
}
