//! Server-streaming call coordination.
//!
//! A [`StreamReader`] is pulled one item at a time. It yields messages in
//! the order the transport delivered them and then exactly one terminal
//! result: `Ok(None)` after an OK trailer, or an error. The terminal result
//! is repeated on every later pull.
//!
//! The transport is suspended while the event channel is full, so a slow
//! reader throttles the producer instead of losing messages.

use std::fmt;

use bytes::Bytes;
use futures::Stream;
use grpcweb_core::error::{CallError, DecodeError, TransportSignal};
use grpcweb_core::message::ProtoMessage;
use grpcweb_core::status::Status;
use grpcweb_transport::demux::Demuxed;
use grpcweb_transport::traits::Transport;

use crate::abort::AbortHandle;
use crate::call::ActiveCall;

enum ReaderState {
    Open,
    Done(Result<(), CallError>),
}

/// Pull-based reader over a server-streaming call.
///
/// Dropping the reader aborts the call.
pub struct StreamReader<T: Transport> {
    call: ActiveCall<T>,
    state: ReaderState,
}

impl<T: Transport> StreamReader<T> {
    pub(crate) const fn new(call: ActiveCall<T>) -> Self {
        Self {
            call,
            state: ReaderState::Open,
        }
    }

    /// Client-assigned id of this call.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.call.info().id
    }

    /// Whether the stream has reached its terminal result.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self.state, ReaderState::Done(_))
    }

    /// A handle that aborts this call from anywhere.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.call.abort_handle()
    }

    /// Abort the call now. Has no effect once the stream is done.
    pub fn abort(&mut self) {
        if !self.is_done() {
            self.terminate(Err(CallError::transport(TransportSignal::Aborted)));
        }
    }

    /// Pull the next message.
    ///
    /// Returns `Ok(None)` once the stream ended with an OK status.
    ///
    /// # Errors
    ///
    /// Returns the terminal error of the stream, on this and every later
    /// call.
    pub async fn next(&mut self) -> Result<Option<Bytes>, CallError> {
        loop {
            if let ReaderState::Done(result) = &self.state {
                return result.clone().map(|()| None);
            }
            match self.call.next().await {
                Demuxed::Frames { message, trailer } => {
                    if let Some(trailer) = trailer {
                        self.terminate(trailer_result(trailer));
                    }
                    if let Some(message) = message {
                        return Ok(Some(message));
                    }
                }
                Demuxed::Failure(signal) => self.terminate(Err(CallError::transport(signal))),
                Demuxed::Ignored => {}
            }
        }
    }

    /// Pull the next message and deserialize it.
    ///
    /// # Errors
    ///
    /// Returns the terminal error of the stream, or
    /// [`CallError::Deserialization`] if the message does not decode as `M`.
    /// A deserialization failure does not end the stream.
    pub async fn recv<M: ProtoMessage + Default>(&mut self) -> Result<Option<M>, CallError> {
        let Some(bytes) = self.next().await? else {
            return Ok(None);
        };
        let mut message = M::default();
        message
            .deserialize(&bytes)
            .map_err(|e| CallError::deserialization(e.to_string()))?;
        Ok(Some(message))
    }

    /// Adapt the reader to a [`Stream`].
    ///
    /// The stream yields each message, then the terminal error if there is
    /// one, then ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, CallError>> + Send {
        futures::stream::unfold(Some(self), |reader| async move {
            let mut reader = reader?;
            match reader.next().await {
                Ok(Some(message)) => Some((Ok(message), Some(reader))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
    }

    fn terminate(&mut self, result: Result<(), CallError>) {
        self.call.finish(result.as_ref().map(|_| ()));
        self.state = ReaderState::Done(result);
    }
}

impl<T: Transport> fmt::Debug for StreamReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader")
            .field("call", self.call.info())
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

fn trailer_result(trailer: Result<Status, DecodeError>) -> Result<(), CallError> {
    match trailer {
        Ok(status) if status.is_ok() => Ok(()),
        Ok(status) => Err(CallError::Status(status)),
        Err(err) => Err(CallError::Decode(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grpcweb_core::StatusCode;

    #[test]
    fn test_trailer_result() {
        assert_eq!(trailer_result(Ok(Status::ok())), Ok(()));
        assert_eq!(
            trailer_result(Ok(Status::new(StatusCode::Aborted, "x"))).map_err(|e| e.code()),
            Err(StatusCode::Aborted)
        );
        assert!(matches!(
            trailer_result(Err(DecodeError::new("bad"))),
            Err(CallError::Decode(_))
        ));
    }
}
