//! HTTP transport configuration types and constants.

use std::time::Duration;

/// Default maximum frame size (16 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Response header announcing a base64 body.
///
/// Lowercase, since HTTP/2 requires lowercase header names.
pub const CONTENT_TRANSFER_ENCODING_HEADER: &str = "content-transfer-encoding";

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Base URL relative endpoints are resolved against. Without one,
    /// endpoints must be absolute URLs.
    pub base_url: Option<String>,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Headers added to every request before the call's own headers.
    pub headers: Vec<(String, String)>,
    /// Maximum size of a single response frame in bytes.
    pub max_message_size: usize,
}

impl HttpTransportConfig {
    /// Create a configuration resolving endpoints against `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            ..Self::default()
        }
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the maximum frame size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            connect_timeout: Duration::from_secs(30),
            headers: Vec::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
