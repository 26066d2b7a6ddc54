//! Unary call coordination.
//!
//! A unary call resolves exactly once, on the first event that decides it:
//!
//! | Event | Outcome |
//! |-------|---------|
//! | message frame | `Ok(message)` |
//! | OK trailer, no message | `Ok` with empty bytes |
//! | non-OK trailer | [`CallError::Status`] |
//! | malformed trailer | [`CallError::Decode`] |
//! | `end`, `close`, `error` | [`CallError::Transport`] |
//!
//! When one event carries both a message and a non-OK or malformed trailer,
//! the trailer decides. Events after the resolving one are discarded and the
//! transport is aborted.

use std::fmt;

use bytes::Bytes;
use grpcweb_core::error::{CallError, DecodeError};
use grpcweb_core::status::Status;
use grpcweb_transport::demux::Demuxed;
use grpcweb_transport::traits::Transport;

use crate::abort::AbortHandle;
use crate::call::ActiveCall;

/// An in-flight unary call.
pub struct UnaryCall<T: Transport> {
    call: ActiveCall<T>,
}

impl<T: Transport> UnaryCall<T> {
    pub(crate) const fn new(call: ActiveCall<T>) -> Self {
        Self { call }
    }

    /// Client-assigned id of this call.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.call.info().id
    }

    /// A handle that aborts this call from anywhere.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.call.abort_handle()
    }

    /// Wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns the error the call resolved with; see the module docs.
    pub async fn wait(mut self) -> Result<Bytes, CallError> {
        let outcome = loop {
            match self.call.next().await {
                Demuxed::Frames { message, trailer } => {
                    if let Some(outcome) = resolve(message, trailer) {
                        break outcome;
                    }
                }
                Demuxed::Failure(signal) => break Err(CallError::transport(signal)),
                Demuxed::Ignored => {}
            }
        };
        self.call.finish(outcome.as_ref().map(|_| ()));
        outcome
    }
}

impl<T: Transport> fmt::Debug for UnaryCall<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnaryCall")
            .field("call", self.call.info())
            .finish_non_exhaustive()
    }
}

/// Decide the outcome from the frames of one event, if they decide it.
fn resolve(
    message: Option<Bytes>,
    trailer: Option<Result<Status, DecodeError>>,
) -> Option<Result<Bytes, CallError>> {
    match (message, trailer) {
        (_, Some(Err(err))) => Some(Err(CallError::Decode(err))),
        (_, Some(Ok(status))) if !status.is_ok() => Some(Err(CallError::Status(status))),
        (Some(message), _) => Some(Ok(message)),
        (None, Some(Ok(_))) => Some(Ok(Bytes::new())),
        (None, None) => None,
    }
}
