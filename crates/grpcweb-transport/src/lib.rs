//! Transport layer for the grpcweb client engine.
//!
//! A transport carries one gateway call. It receives headers, a timeout and
//! a request body, and reports what happens through an event channel that
//! the call coordinator drains.
//!
//! # Overview
//!
//! - [`traits::Transport`] and [`traits::Connector`]: the per-call contract
//! - [`event`]: the bounded event channel between transport and coordinator
//! - [`demux::Demultiplexer`]: turns raw events into frames, decoded
//!   trailers and terminal signals
//! - [`stream_parser`]: incremental parsing of the gateway's response body
//!
//! # Available Transports
//!
//! | Transport | Use Case | Feature Flag |
//! |-----------|----------|--------------|
//! | [`memory::ScriptedTransport`] | Tests, replaying a fixed event script | Always available |
//! | `http::HttpTransport` | A real gateway over HTTP | `http` |
//!
//! # Example
//!
//! ```rust
//! use grpcweb_transport::demux::{Demultiplexer, Demuxed};
//! use grpcweb_transport::event::{DataEvent, event_channel};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (sink, events) = event_channel(4);
//! sink.emit(DataEvent::message(vec![1, 2, 3]).into()).await.unwrap();
//!
//! let mut demux = Demultiplexer::new(events);
//! assert!(matches!(demux.next().await, Demuxed::Frames { message: Some(_), .. }));
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::unwrap_used)]
#![allow(clippy::module_name_repetitions)]

pub mod demux;
pub mod error;
pub mod event;
pub mod http;
pub mod memory;
pub mod stream_parser;
pub mod traits;

pub use demux::{Demultiplexer, Demuxed};
pub use error::TransportError;
pub use event::{DEFAULT_EVENT_BUFFER, DataEvent, EventSink, EventStream, TransportEvent, event_channel};
pub use memory::{Recorder, RecordedRequest, Script, ScriptedConnector, ScriptedTransport};
pub use traits::{Connector, FRAMING_HEADERS, HttpMethod, Transport};

pub use http::HttpTransportConfig;
#[cfg(feature = "http")]
pub use http::{HttpConnector, HttpTransport};

pub use bytes::Bytes;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::demux::{Demultiplexer, Demuxed};
    pub use crate::error::TransportError;
    pub use crate::event::{DataEvent, EventSink, EventStream, TransportEvent, event_channel};
    pub use crate::memory::{Script, ScriptedConnector, ScriptedTransport};
    pub use crate::traits::{Connector, HttpMethod, Transport};

    pub use crate::http::HttpTransportConfig;
    #[cfg(feature = "http")]
    pub use crate::http::{HttpConnector, HttpTransport};
}
