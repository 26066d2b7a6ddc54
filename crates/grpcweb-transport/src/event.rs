//! Transport events and the bounded hand-off between a transport and a call.
//!
//! A transport reports progress by emitting [`TransportEvent`]s into an
//! [`EventSink`]. The call coordinator owns the matching [`EventStream`].
//!
//! The channel is bounded. When it is full, [`EventSink::emit`] suspends the
//! producer until the coordinator pulls, so frames are never dropped. When the
//! coordinator has finished with the call it drops the stream, and further
//! emits fail with [`TransportError::ConnectionClosed`] so the producer can
//! stop.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 16;

/// Payload of a `data` event.
///
/// Position 1 carries a message frame and position 2 a trailer frame. A
/// `None` slot means the frame kind is absent from this event. A present
/// frame may be zero-length: that is how a default-valued message or an OK
/// status without details travels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataEvent {
    message: Option<Bytes>,
    trailer: Option<Bytes>,
}

impl DataEvent {
    /// A data event carrying both a message and a trailer frame.
    #[must_use]
    pub fn new(message: impl Into<Bytes>, trailer: impl Into<Bytes>) -> Self {
        Self::from_slots(Some(message.into()), Some(trailer.into()))
    }

    /// Build a data event from positional slots.
    #[must_use]
    pub const fn from_slots(message: Option<Bytes>, trailer: Option<Bytes>) -> Self {
        Self { message, trailer }
    }

    /// A data event carrying only a message frame.
    #[must_use]
    pub fn message(message: impl Into<Bytes>) -> Self {
        Self::from_slots(Some(message.into()), None)
    }

    /// A data event carrying only a trailer frame.
    #[must_use]
    pub fn trailer(trailer: impl Into<Bytes>) -> Self {
        Self::from_slots(None, Some(trailer.into()))
    }

    /// The message frame, if present.
    #[must_use]
    pub const fn message_frame(&self) -> Option<&Bytes> {
        self.message.as_ref()
    }

    /// The trailer frame, if present.
    #[must_use]
    pub const fn trailer_frame(&self) -> Option<&Bytes> {
        self.trailer.as_ref()
    }

    /// Whether neither slot is populated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.message.is_none() && self.trailer.is_none()
    }

    /// Split into `(message, trailer)`.
    #[must_use]
    pub fn into_parts(self) -> (Option<Bytes>, Option<Bytes>) {
        (self.message, self.trailer)
    }
}

/// A notification emitted by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The underlying stream has buffered data ready to be read.
    Readable,
    /// Positional frame payload.
    Data(DataEvent),
    /// The response stream ended.
    End,
    /// The underlying connection closed.
    Close,
    /// The transport failed.
    Error {
        /// HTTP status of the response, when one was received.
        http_status: Option<u16>,
        /// Description of the failure.
        message: Option<String>,
    },
}

impl TransportEvent {
    /// The event name as used by node-style readable streams.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Readable => "readable",
            Self::Data(_) => "data",
            Self::End => "end",
            Self::Close => "close",
            Self::Error { .. } => "error",
        }
    }

    /// An error event with only a description.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            http_status: None,
            message: Some(message.into()),
        }
    }
}

impl From<DataEvent> for TransportEvent {
    fn from(data: DataEvent) -> Self {
        Self::Data(data)
    }
}

/// Create a bounded event channel.
///
/// A capacity of zero is raised to one.
#[must_use]
pub fn event_channel(capacity: usize) -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (EventSink { tx }, EventStream { rx })
}

/// Producer side of the event channel, handed to a transport on send.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<TransportEvent>,
}

impl EventSink {
    /// Emit an event, waiting for room in the channel.
    pub async fn emit(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Emit an event without waiting.
    ///
    /// Fails with [`TransportError::Backpressure`] when the channel is full,
    /// handing the event back so the producer can retry it.
    pub fn try_emit(&self, event: TransportEvent) -> Result<(), TransportError> {
        self.tx.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(event) => TransportError::Backpressure {
                event: Box::new(event),
            },
            mpsc::error::TrySendError::Closed(_) => TransportError::ConnectionClosed,
        })
    }

    /// Whether the consumer has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Wait until the consumer has gone away.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}

/// Consumer side of the event channel, owned by the call coordinator.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<TransportEvent>,
}

impl EventStream {
    /// Receive the next event.
    ///
    /// Returns `None` once every sink has been dropped and the buffer is
    /// drained.
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }

    /// Take an already buffered event without waiting.
    ///
    /// `Poll::Pending` means the buffer is empty; `Poll::Ready(None)` means
    /// every sink is gone and the buffer is drained.
    pub fn try_recv(&mut self) -> Poll<Option<TransportEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Poll::Ready(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Poll::Pending,
            Err(mpsc::error::TryRecvError::Disconnected) => Poll::Ready(None),
        }
    }

    /// Stop accepting events. Buffered events can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for EventStream {
    type Item = TransportEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
