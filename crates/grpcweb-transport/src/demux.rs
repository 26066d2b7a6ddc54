//! Frame demultiplexing.
//!
//! Turns raw [`TransportEvent`]s into what a call coordinator acts on:
//! message frames, decoded (or undecodable) trailers, and terminal transport
//! signals. Trailers are decoded here so coordinators only ever see a
//! [`Status`] or a [`DecodeError`].

use std::task::Poll;

use bytes::Bytes;
use grpcweb_core::error::{DecodeError, TransportSignal};
use grpcweb_core::status::Status;
use tracing::trace;

use crate::event::{EventStream, TransportEvent};

/// A classified transport event.
#[derive(Debug, Clone, PartialEq)]
pub enum Demuxed {
    /// Frames from one `data` event. The message, if any, precedes the
    /// trailer.
    Frames {
        /// Message frame.
        message: Option<Bytes>,
        /// Decoded trailer frame.
        trailer: Option<Result<Status, DecodeError>>,
    },
    /// The transport ended without a trailer.
    Failure(TransportSignal),
    /// A notification with no bearing on the call outcome.
    Ignored,
}

/// Classify a single event.
///
/// `readable` is treated as a failure unless `expect_readable` is set.
#[must_use]
pub fn classify(event: TransportEvent, expect_readable: bool) -> Demuxed {
    match event {
        TransportEvent::Data(data) => {
            let (message, trailer) = data.into_parts();
            Demuxed::Frames {
                message,
                trailer: trailer.map(|bytes| Status::decode(&bytes)),
            }
        }
        TransportEvent::Readable if expect_readable => Demuxed::Ignored,
        TransportEvent::Readable => Demuxed::Failure(TransportSignal::Readable),
        TransportEvent::End => Demuxed::Failure(TransportSignal::End),
        TransportEvent::Close => Demuxed::Failure(TransportSignal::Close),
        TransportEvent::Error {
            http_status,
            message,
        } => Demuxed::Failure(TransportSignal::Error {
            http_status,
            message,
        }),
    }
}

/// Pulls events for one call and classifies them.
#[derive(Debug)]
pub struct Demultiplexer {
    events: EventStream,
    expect_readable: bool,
}

impl Demultiplexer {
    /// Wrap the consumer side of a call's event channel.
    #[must_use]
    pub const fn new(events: EventStream) -> Self {
        Self {
            events,
            expect_readable: false,
        }
    }

    /// Treat `readable` notifications as informational.
    #[must_use]
    pub const fn expect_readable(mut self, expect: bool) -> Self {
        self.expect_readable = expect;
        self
    }

    /// Wait for the next event that bears on the call outcome.
    ///
    /// If the transport drops its sink without a terminal event this yields
    /// [`TransportSignal::Disconnected`].
    pub async fn next(&mut self) -> Demuxed {
        loop {
            let Some(event) = self.events.recv().await else {
                return Demuxed::Failure(TransportSignal::Disconnected);
            };
            if let Some(demuxed) = self.accept(event) {
                return demuxed;
            }
        }
    }

    /// Like [`Demultiplexer::next`], but only looks at events that are
    /// already buffered. Returns `None` when nothing relevant is waiting.
    pub fn try_next(&mut self) -> Option<Demuxed> {
        loop {
            match self.events.try_recv() {
                Poll::Pending => return None,
                Poll::Ready(None) => return Some(Demuxed::Failure(TransportSignal::Disconnected)),
                Poll::Ready(Some(event)) => {
                    if let Some(demuxed) = self.accept(event) {
                        return Some(demuxed);
                    }
                }
            }
        }
    }

    fn accept(&self, event: TransportEvent) -> Option<Demuxed> {
        trace!(event = event.name(), "transport event");
        match classify(event, self.expect_readable) {
            Demuxed::Ignored => None,
            Demuxed::Frames {
                message: None,
                trailer: None,
            } => {
                trace!("data event with no frames");
                None
            }
            other => Some(other),
        }
    }

    /// Stop accepting events from the transport.
    pub fn close(&mut self) {
        self.events.close();
    }
}
