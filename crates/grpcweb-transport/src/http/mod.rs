//! HTTP transport for a gRPC-Web gateway.
//!
//! Requests are sent as `POST` with a serialized protobuf body. The
//! response body is read incrementally, decoded from base64 when the
//! gateway answers with `Content-Transfer-Encoding: base64`, and parsed
//! into message and trailer frames that are emitted as `data` events.
//!
//! # Example
//!
//! ```rust
//! use grpcweb_transport::http::HttpTransportConfig;
//! use std::time::Duration;
//!
//! let config = HttpTransportConfig::new("https://gateway.example.com")
//!     .with_connect_timeout(Duration::from_secs(5))
//!     .with_max_message_size(1024 * 1024);
//!
//! assert_eq!(config.base_url.as_deref(), Some("https://gateway.example.com"));
//! ```

mod config;

#[cfg(feature = "http")]
mod client;

pub use config::{CONTENT_TRANSFER_ENCODING_HEADER, DEFAULT_MAX_MESSAGE_SIZE, HttpTransportConfig};

#[cfg(feature = "http")]
pub use client::{HttpConnector, HttpTransport};
