//! State shared by both call coordinators.

use std::sync::Arc;
use std::time::Duration;

use grpcweb_core::error::{CallError, TransportSignal};
use grpcweb_transport::demux::{Demultiplexer, Demuxed};
use grpcweb_transport::traits::Transport;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::abort::AbortHandle;
use crate::observer::{CallInfo, CallObserver};

/// A dispatched call: its transport, its event stream and the signals that
/// can cut it short.
pub(crate) struct ActiveCall<T: Transport> {
    info: CallInfo,
    transport: T,
    demux: Demultiplexer,
    abort: AbortHandle,
    deadline: Option<(Instant, Duration)>,
    observer: Arc<dyn CallObserver>,
    finished: bool,
}

impl<T: Transport> ActiveCall<T> {
    pub(crate) fn new(
        info: CallInfo,
        transport: T,
        demux: Demultiplexer,
        timeout: Option<Duration>,
        observer: Arc<dyn CallObserver>,
    ) -> Self {
        Self {
            info,
            transport,
            demux,
            abort: AbortHandle::new(),
            deadline: timeout.map(|after| (Instant::now() + after, after)),
            observer,
            finished: false,
        }
    }

    pub(crate) const fn info(&self) -> &CallInfo {
        &self.info
    }

    pub(crate) fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Wait for the next event bearing on the outcome.
    ///
    /// Abort takes precedence over everything. Events already buffered are
    /// delivered before an expired deadline is honored; the deadline only
    /// wins over events that arrive after it.
    pub(crate) async fn next(&mut self) -> Demuxed {
        let event = if self.abort.is_aborted() {
            Demuxed::Failure(TransportSignal::Aborted)
        } else if let Some(event) = self.demux.try_next() {
            event
        } else {
            self.wait_for_event().await
        };

        if let Demuxed::Frames { message, trailer } = &event {
            if let Some(message) = message {
                self.observer.on_message(&self.info, message.len());
            }
            if let Some(Ok(status)) = trailer {
                self.observer.on_trailer(&self.info, status);
            }
        }
        event
    }

    async fn wait_for_event(&mut self) -> Demuxed {
        let abort = self.abort.clone();
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some((at, after)) => {
                    tokio::time::sleep_until(at).await;
                    after
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = abort.aborted() => Demuxed::Failure(TransportSignal::Aborted),
            after = expired => Demuxed::Failure(TransportSignal::TimedOut(after)),
            event = self.demux.next() => event,
        }
    }

    /// Tear the call down once its outcome is known. Only the first call
    /// has an effect.
    pub(crate) fn finish(&mut self, result: Result<(), &CallError>) {
        if self.finished {
            return;
        }
        self.finished = true;
        match result {
            Ok(()) => trace!(call_id = self.info.id, "call resolved"),
            Err(err) => debug!(call_id = self.info.id, error = %err, "call resolved with error"),
        }
        self.transport.abort();
        self.demux.close();
        self.observer.on_finished(&self.info, result);
    }
}

impl<T: Transport> Drop for ActiveCall<T> {
    fn drop(&mut self) {
        if !self.finished {
            trace!(call_id = self.info.id, "call dropped before resolution");
            self.transport.abort();
        }
    }
}
