//! # grpcweb - gRPC-Web client call engine for Rust
//!
//! Issue unary and server-streaming RPCs through a gRPC-Web gateway and get
//! back either a single response or an ordered message stream, each ending
//! in exactly one canonical status.
//!
//! ## Features
//!
//! - **Exactly-once outcomes**: a unary call resolves once; a stream ends
//!   with one terminal result that repeats on every later pull
//! - **Back-pressure**: a slow reader suspends the transport instead of
//!   losing messages
//! - **Cancellation and deadlines** that wake suspended callers promptly
//! - **Rich error handling** with miette diagnostics
//! - **Pluggable transports**: a scripted in-memory transport for tests and
//!   an HTTP transport behind the `http` feature
//!
//! ## Quick Start
//!
//! ```rust
//! use grpcweb::prelude::*;
//! use grpcweb::transport::memory::{Script, ScriptedConnector};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), CallError> {
//! let connector = ScriptedConnector::new();
//! connector.push(Script::new().message_with_trailer(vec![0xaa], &Status::ok()));
//!
//! let client = GatewayClient::new(connector);
//! let response = client.unary_call("/pkg.Service/Get", &vec![0x01_u8], &[]).await?;
//! assert_eq!(&response[..], &[0xaa]);
//! # Ok(())
//! # }
//! ```
//!
//! With the `http` feature, connect to a real gateway:
//!
//! ```ignore
//! use grpcweb::prelude::*;
//!
//! let connector = HttpConnector::new(HttpTransportConfig::new("https://gateway.example.com"))?;
//! let client = GatewayClient::new(connector);
//! let mut reader = client.server_streaming("/pkg.Service/List", &request, &[])?;
//! while let Some(message) = reader.next().await? {
//!     // ...
//! }
//! ```
//!
//! ## Crate Organization
//!
//! - [`grpcweb_core`] - Status codes, trailer decoding, errors (no async runtime)
//! - [`grpcweb_transport`] - Transport contract, event channel, demultiplexer
//! - [`grpcweb_client`] - Unary and streaming call coordinators

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

// Re-export all public items from core
pub use grpcweb_core::*;

// Re-export client types
pub use grpcweb_client::{
    AbortHandle, Call, CallInfo, CallKind, CallObserver, CallOption, ClientConfig, GatewayClient,
    GatewayClientBuilder, NoopObserver, PendingCall, StreamReader, TracingObserver, UnaryCall,
};

// Re-export transport types
pub use grpcweb_transport::{Connector, Transport, TransportError, TransportEvent};

pub mod prelude;

/// Transport module re-exports
pub mod transport {
    //! Transport layer types.
    pub use grpcweb_transport::*;
}

/// Client module re-exports
pub mod client {
    //! Call coordinator types.
    pub use grpcweb_client::*;
}
