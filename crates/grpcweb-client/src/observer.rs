//! Call lifecycle observation.
//!
//! A [`CallObserver`] is notified as each call is dispatched, receives
//! frames and finishes. All methods have no-op defaults, so implementors
//! override only what they need. Notifications are delivered synchronously
//! on the task driving the call and must not block.

use std::fmt;
use std::sync::Arc;

use grpcweb_core::error::CallError;
use grpcweb_core::status::Status;
use tracing::{debug, trace};

/// The shape of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// One request, one response.
    Unary,
    /// One request, a sequence of responses.
    ServerStreaming,
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unary => f.write_str("unary"),
            Self::ServerStreaming => f.write_str("server-streaming"),
        }
    }
}

/// Identifies a call to an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    /// Client-assigned call id, unique per client.
    pub id: u64,
    /// Endpoint of the RPC.
    pub endpoint: Arc<str>,
    /// Shape of the call.
    pub kind: CallKind,
}

/// Observer of call lifecycle events.
///
/// # Example
///
/// ```rust
/// use grpcweb_client::observer::{CallInfo, CallObserver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountMessages(AtomicUsize);
///
/// impl CallObserver for CountMessages {
///     fn on_message(&self, _call: &CallInfo, _len: usize) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait CallObserver: Send + Sync {
    /// The request was handed to the transport.
    fn on_dispatch(&self, _call: &CallInfo) {}

    /// A message frame of `len` bytes arrived.
    fn on_message(&self, _call: &CallInfo, _len: usize) {}

    /// A trailer was decoded.
    fn on_trailer(&self, _call: &CallInfo, _status: &Status) {}

    /// The call reached its outcome. Called exactly once per dispatched call.
    fn on_finished(&self, _call: &CallInfo, _result: Result<(), &CallError>) {}
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CallObserver for NoopObserver {}

/// An observer that records lifecycle events with `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CallObserver for TracingObserver {
    fn on_dispatch(&self, call: &CallInfo) {
        debug!(call_id = call.id, endpoint = %call.endpoint, kind = %call.kind, "call dispatched");
    }

    fn on_message(&self, call: &CallInfo, len: usize) {
        trace!(call_id = call.id, len, "message frame");
    }

    fn on_trailer(&self, call: &CallInfo, status: &Status) {
        debug!(call_id = call.id, code = %status.code(), details = status.details(), "trailer");
    }

    fn on_finished(&self, call: &CallInfo, result: Result<(), &CallError>) {
        match result {
            Ok(()) => debug!(call_id = call.id, "call finished"),
            Err(err) => debug!(call_id = call.id, code = %err.code(), error = %err, "call failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(CallKind::Unary.to_string(), "unary");
        assert_eq!(CallKind::ServerStreaming.to_string(), "server-streaming");
    }

    #[test]
    fn test_default_methods_are_noops() {
        let info = CallInfo {
            id: 1,
            endpoint: Arc::from("/svc/M"),
            kind: CallKind::Unary,
        };
        let observers: [&dyn CallObserver; 2] = [&NoopObserver, &TracingObserver];
        for observer in observers {
            observer.on_dispatch(&info);
            observer.on_message(&info, 3);
            observer.on_trailer(&info, &Status::ok());
            observer.on_finished(&info, Ok(()));
        }
    }
}
