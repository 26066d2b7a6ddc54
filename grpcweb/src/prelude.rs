//! Prelude module for convenient imports.
//!
//! ```rust
//! use grpcweb::prelude::*;
//!
//! let status = Status::new(StatusCode::NotFound, "missing");
//! let option = CallOption::header("x-user", "42");
//! # let _ = (status, option);
//! ```
//!
//! ## Included Types
//!
//! - Status and error types (`Status`, `StatusCode`, `CallError`)
//! - Payload contract (`ProtoMessage`, `Prost`)
//! - Client types (`GatewayClient`, `CallOption`, `StreamReader`, ...)
//! - Transport contract (`Transport`, `Connector`) and the scripted transport
//! - The HTTP connector, with the `http` feature

// Core types
pub use grpcweb_core::{
    Bytes, CallError, DecodeError, Metadata, Prost, ProtoMessage, Status, StatusCode,
    TransportSignal,
};

// Client types
pub use grpcweb_client::prelude::*;

// Transport types
pub use grpcweb_transport::{Connector, ScriptedConnector, Transport, TransportError};

pub use grpcweb_transport::HttpTransportConfig;
#[cfg(feature = "http")]
pub use grpcweb_transport::HttpConnector;
