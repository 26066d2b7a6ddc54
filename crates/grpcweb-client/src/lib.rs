//! Call coordinators for the grpcweb client engine.
//!
//! This crate turns the event stream of a transport into call outcomes:
//!
//! - [`UnaryCall`]: one awaited response, resolved exactly once
//! - [`StreamReader`]: an ordered, pull-based message sequence ending in
//!   exactly one terminal result
//!
//! [`GatewayClient`] dispatches calls through a
//! [`Connector`](grpcweb_transport::Connector), applying [`CallOption`]s,
//! framing headers and deadlines.
//!
//! # Example
//!
//! ```rust
//! use grpcweb_client::{CallOption, GatewayClient};
//! use grpcweb_core::Status;
//! use grpcweb_transport::memory::{Script, ScriptedConnector};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), grpcweb_core::CallError> {
//! let connector = ScriptedConnector::new();
//! connector.push(
//!     Script::new()
//!         .message(vec![0x01])
//!         .message(vec![0x02])
//!         .trailer(&Status::ok()),
//! );
//!
//! let client = GatewayClient::new(connector);
//! let mut reader = client.server_streaming(
//!     "/pkg.Service/List",
//!     &vec![0x01_u8],
//!     &[CallOption::header("x-trace", "1")],
//! )?;
//!
//! while let Some(message) = reader.next().await? {
//!     println!("{} bytes", message.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Observing Calls
//!
//! Implement [`CallObserver`] to receive dispatch, frame and completion
//! notifications, or install [`TracingObserver`] to log them.

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod abort;
pub mod builder;
mod call;
pub mod client;
pub mod config;
pub mod observer;
pub mod stream;
pub mod unary;

// Re-export commonly used types
pub use abort::AbortHandle;
pub use builder::GatewayClientBuilder;
pub use client::GatewayClient;
pub use config::{Call, CallOption, ClientConfig, DEFAULT_UNARY_TIMEOUT, PendingCall};
pub use observer::{CallInfo, CallKind, CallObserver, NoopObserver, TracingObserver};
pub use stream::StreamReader;
pub use unary::UnaryCall;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::abort::AbortHandle;
    pub use crate::builder::GatewayClientBuilder;
    pub use crate::client::GatewayClient;
    pub use crate::config::{CallOption, ClientConfig};
    pub use crate::observer::{CallObserver, TracingObserver};
    pub use crate::stream::StreamReader;
    pub use crate::unary::UnaryCall;
}
