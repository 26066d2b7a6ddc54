//! The transport contract.
//!
//! A [`Transport`] carries exactly one call: it accepts headers and a
//! timeout, sends one request, reports progress through an [`EventSink`], and
//! can be aborted. A [`Connector`] creates a fresh transport per call.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::TransportError;
use crate::event::EventSink;

/// `Content-Type` of every request.
pub const CONTENT_TYPE: &str = "application/x-protobuf";

/// Header asking the gateway for a base64 response body.
pub const ACCEPT_TRANSFER_ENCODING_HEADER: &str = "X-Accept-Content-Transfer-Encoding";

/// Header asking the gateway for a streamed response.
pub const ACCEPT_RESPONSE_STREAMING_HEADER: &str = "X-Accept-Response-Streaming";

/// Headers written on every request after caller-supplied options.
pub const FRAMING_HEADERS: [(&str, &str); 3] = [
    ("Content-Type", CONTENT_TYPE),
    (ACCEPT_TRANSFER_ENCODING_HEADER, "base64"),
    (ACCEPT_RESPONSE_STREAMING_HEADER, "true"),
];

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl HttpMethod {
    /// The method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-call streaming transport.
///
/// Implementations must emit every outcome through the sink handed to
/// [`Transport::send`]: message and trailer frames as `data` events, and any
/// failure as `end`, `close` or `error`. Emitting must stop once the sink
/// reports that the consumer has gone away.
pub trait Transport: Send + 'static {
    /// Set a request header. Later values for the same name replace earlier
    /// ones.
    fn set_header(&mut self, name: &str, value: &str);

    /// Set the overall timeout of the request.
    fn set_timeout(&mut self, timeout: Duration);

    /// Send the request and start emitting events.
    ///
    /// Must not block; I/O happens in the background.
    fn send(
        &mut self,
        endpoint: &str,
        method: HttpMethod,
        body: Bytes,
        events: EventSink,
    ) -> Result<(), TransportError>;

    /// Terminate the request. Idempotent.
    fn abort(&mut self);
}

/// Creates one transport per call.
pub trait Connector: Send + Sync {
    /// The transport type produced.
    type Transport: Transport;

    /// Create a transport for a new call.
    fn connect(&self) -> Result<Self::Transport, TransportError>;
}

impl<F, T> Connector for F
where
    F: Fn() -> Result<T, TransportError> + Send + Sync,
    T: Transport,
{
    type Transport = T;

    fn connect(&self) -> Result<T, TransportError> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        assert_eq!(HttpMethod::Post.to_string(), "POST");
        assert_eq!(HttpMethod::Get.as_str(), "GET");
    }

    #[test]
    fn test_framing_headers() {
        assert!(FRAMING_HEADERS.contains(&("Content-Type", "application/x-protobuf")));
        assert!(FRAMING_HEADERS.contains(&("X-Accept-Content-Transfer-Encoding", "base64")));
        assert!(FRAMING_HEADERS.contains(&("X-Accept-Response-Streaming", "true")));
    }
}
