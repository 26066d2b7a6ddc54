//! # grpcweb-core
//!
//! Core types for the grpcweb client engine.
//!
//! This crate provides the building blocks shared by the transport and client
//! layers:
//!
//! - **Status codes**: the canonical [`StatusCode`] enumeration and the
//!   HTTP-to-canonical mapping
//! - **Trailer decoding**: [`Status::decode`] for terminal status frames
//! - **Error handling**: the [`CallError`] taxonomy with miette diagnostics
//! - **Payload contract**: the [`ProtoMessage`] trait for request/response codecs
//!
//! This crate does not depend on any async runtime.
//!
//! # Example
//!
//! ```rust
//! use grpcweb_core::{Status, StatusCode};
//!
//! let trailer = Status::new(StatusCode::NotFound, "missing").encode_trailer();
//! let status = Status::decode(&trailer)?;
//! assert_eq!(status.code(), StatusCode::NotFound);
//! assert_eq!(StatusCode::from_http_status(401), StatusCode::Unauthenticated);
//! # Ok::<(), grpcweb_core::DecodeError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod message;
pub mod status;

pub use error::{CallError, DecodeError, TransportSignal};
pub use message::{CodecError, Prost, ProtoMessage};
pub use status::{Metadata, Status, StatusCode};

// Re-export bytes for payload handling
pub use bytes::Bytes;
