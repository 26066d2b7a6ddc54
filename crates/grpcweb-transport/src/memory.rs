//! In-memory scripted transport for testing.
//!
//! A [`ScriptedTransport`] plays back a fixed [`Script`] of events once the
//! request is sent, and records everything the call engine applied to it:
//! headers, timeout, endpoint, method and body. It is primarily useful for
//! testing call coordinators without network I/O.
//!
//! # Example
//!
//! ```rust
//! use grpcweb_core::{Status, StatusCode};
//! use grpcweb_transport::memory::{Script, ScriptedConnector};
//!
//! let connector = ScriptedConnector::new();
//! let recorder = connector.push(
//!     Script::new()
//!         .message(vec![0xaa])
//!         .trailer(&Status::ok()),
//! );
//! assert!(recorder.snapshot().endpoint.is_none());
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use grpcweb_core::status::Status;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::event::{DataEvent, EventSink, TransportEvent};
use crate::traits::{Connector, HttpMethod, Transport};

/// One step of a script.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit an event.
    Emit(TransportEvent),
    /// Wait before the next step.
    Delay(Duration),
    /// Stop emitting and keep the connection open until aborted.
    Hang,
}

/// An ordered list of steps played back after `send`.
///
/// When the script runs out the transport drops its sink.
#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    /// Create an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary event.
    #[must_use]
    pub fn event(mut self, event: TransportEvent) -> Self {
        self.steps.push(ScriptStep::Emit(event));
        self
    }

    /// Append a `data` event with a message frame only.
    #[must_use]
    pub fn message(self, message: impl Into<Bytes>) -> Self {
        self.event(DataEvent::message(message).into())
    }

    /// Append a `data` event with a trailer frame only.
    #[must_use]
    pub fn trailer(self, status: &Status) -> Self {
        self.event(DataEvent::trailer(status.encode_trailer()).into())
    }

    /// Append a `data` event with raw trailer bytes.
    #[must_use]
    pub fn raw_trailer(self, trailer: impl Into<Bytes>) -> Self {
        self.event(DataEvent::trailer(trailer).into())
    }

    /// Append a `data` event carrying both a message and a trailer.
    #[must_use]
    pub fn message_with_trailer(self, message: impl Into<Bytes>, status: &Status) -> Self {
        self.event(DataEvent::new(message, status.encode_trailer()).into())
    }

    /// Append an `end` event.
    #[must_use]
    pub fn end(self) -> Self {
        self.event(TransportEvent::End)
    }

    /// Append a `close` event.
    #[must_use]
    pub fn close(self) -> Self {
        self.event(TransportEvent::Close)
    }

    /// Append an `error` event.
    #[must_use]
    pub fn error(self, http_status: Option<u16>, message: impl Into<String>) -> Self {
        self.event(TransportEvent::Error {
            http_status,
            message: Some(message.into()),
        })
    }

    /// Append a pause.
    #[must_use]
    pub fn delay(mut self, duration: Duration) -> Self {
        self.steps.push(ScriptStep::Delay(duration));
        self
    }

    /// Keep the connection open indefinitely after the previous steps.
    #[must_use]
    pub fn hang(mut self) -> Self {
        self.steps.push(ScriptStep::Hang);
        self
    }

    /// The steps of this script.
    #[must_use]
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }
}

/// What the call engine did to a scripted transport.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    /// Headers in the order they were set; later values win on lookup.
    pub headers: Vec<(String, String)>,
    /// Timeout, if one was set.
    pub timeout: Option<Duration>,
    /// Endpoint passed to `send`.
    pub endpoint: Option<String>,
    /// Method passed to `send`.
    pub method: Option<HttpMethod>,
    /// Body passed to `send`.
    pub body: Option<Bytes>,
    /// Whether `abort` was called.
    pub aborted: bool,
    /// Number of events the consumer accepted.
    pub events_emitted: usize,
}

impl RecordedRequest {
    /// The effective value of a header (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Effective headers keyed by lower-cased name.
    #[must_use]
    pub fn header_map(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect()
    }
}

/// Shared view of a [`RecordedRequest`].
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<RecordedRequest>>,
}

impl Recorder {
    /// A copy of the current record.
    #[must_use]
    pub fn snapshot(&self) -> RecordedRequest {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update(&self, f: impl FnOnce(&mut RecordedRequest)) {
        f(&mut self.inner.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

/// A transport that plays back a [`Script`].
///
/// Playback runs on a spawned tokio task, so `send` must be called from
/// within a runtime.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Option<Script>,
    recorder: Recorder,
    aborted: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ScriptedTransport {
    /// Create a transport that will play `script`.
    #[must_use]
    pub fn new(script: Script) -> Self {
        Self {
            script: Some(script),
            recorder: Recorder::default(),
            aborted: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }

    /// A handle to what this transport records.
    #[must_use]
    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    async fn play(script: Script, events: EventSink, recorder: Recorder, aborted: Arc<AtomicBool>) {
        for step in script.steps {
            if aborted.load(Ordering::SeqCst) {
                return;
            }
            match step {
                ScriptStep::Emit(event) => {
                    trace!(event = event.name(), "scripted event");
                    if events.emit(event).await.is_err() {
                        debug!("consumer gone, stopping playback");
                        return;
                    }
                    recorder.update(|r| r.events_emitted += 1);
                }
                ScriptStep::Delay(duration) => tokio::time::sleep(duration).await,
                ScriptStep::Hang => {
                    // Hold the sink so the consumer sees no disconnect.
                    events.closed().await;
                    return;
                }
            }
        }
    }
}

impl Transport for ScriptedTransport {
    fn set_header(&mut self, name: &str, value: &str) {
        self.recorder
            .update(|r| r.headers.push((name.to_string(), value.to_string())));
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.recorder.update(|r| r.timeout = Some(timeout));
    }

    fn send(
        &mut self,
        endpoint: &str,
        method: HttpMethod,
        body: Bytes,
        events: EventSink,
    ) -> Result<(), TransportError> {
        let script = self.script.take().ok_or(TransportError::AlreadySent)?;
        self.recorder.update(|r| {
            r.endpoint = Some(endpoint.to_string());
            r.method = Some(method);
            r.body = Some(body);
        });

        self.task = Some(tokio::spawn(Self::play(
            script,
            events,
            self.recorder.clone(),
            Arc::clone(&self.aborted),
        )));
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.recorder.update(|r| r.aborted = true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// A connector handing out scripted transports in FIFO order.
///
/// Connecting with no script queued fails with a connection error.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConnector {
    queue: Arc<Mutex<VecDeque<ScriptedTransport>>>,
}

impl ScriptedConnector {
    /// Create an empty connector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script for the next call and return its recorder.
    pub fn push(&self, script: Script) -> Recorder {
        let transport = ScriptedTransport::new(script);
        let recorder = transport.recorder();
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(transport);
        recorder
    }

    /// Number of queued scripts.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&self) -> Result<ScriptedTransport, TransportError> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or_else(|| TransportError::connection("no scripted transport queued"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_channel;
    use grpcweb_core::StatusCode;

    #[tokio::test]
    async fn test_playback_and_recording() {
        let mut transport = ScriptedTransport::new(
            Script::new()
                .message(vec![0x01])
                .trailer(&Status::ok()),
        );
        let recorder = transport.recorder();

        transport.set_header("Content-Type", "application/x-protobuf");
        transport.set_timeout(Duration::from_secs(1));

        let (sink, mut events) = event_channel(4);
        transport
            .send("/svc/Method", HttpMethod::Post, Bytes::from_static(&[0x01]), sink)
            .unwrap();

        assert_eq!(
            events.recv().await,
            Some(TransportEvent::Data(DataEvent::message(vec![0x01])))
        );
        assert!(matches!(events.recv().await, Some(TransportEvent::Data(_))));
        assert_eq!(events.recv().await, None);

        let record = recorder.snapshot();
        assert_eq!(record.endpoint.as_deref(), Some("/svc/Method"));
        assert_eq!(record.method, Some(HttpMethod::Post));
        assert_eq!(record.body, Some(Bytes::from_static(&[0x01])));
        assert_eq!(record.timeout, Some(Duration::from_secs(1)));
        assert_eq!(record.header("content-type"), Some("application/x-protobuf"));
        assert_eq!(record.events_emitted, 2);
    }

    #[tokio::test]
    async fn test_send_twice_fails() {
        let mut transport = ScriptedTransport::new(Script::new());
        let (sink, _events) = event_channel(1);
        transport
            .send("/a", HttpMethod::Post, Bytes::new(), sink.clone())
            .unwrap();
        assert!(matches!(
            transport.send("/a", HttpMethod::Post, Bytes::new(), sink),
            Err(TransportError::AlreadySent)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_stops_playback() {
        let mut transport = ScriptedTransport::new(
            Script::new()
                .delay(Duration::from_secs(10))
                .trailer(&Status::new(StatusCode::Internal, "late")),
        );
        let recorder = transport.recorder();
        let (sink, mut events) = event_channel(1);
        transport
            .send("/a", HttpMethod::Post, Bytes::new(), sink)
            .unwrap();

        transport.abort();
        assert_eq!(events.recv().await, None);
        assert!(recorder.snapshot().aborted);
        assert_eq!(recorder.snapshot().events_emitted, 0);
    }

    #[test]
    fn test_connector_is_fifo() {
        let connector = ScriptedConnector::new();
        connector.push(Script::new().end());
        connector.push(Script::new().close());
        assert_eq!(connector.pending(), 2);

        let first = connector.connect().unwrap();
        assert!(matches!(
            first.script.as_ref().map(Script::steps),
            Some([ScriptStep::Emit(TransportEvent::End)])
        ));
        let _second = connector.connect().unwrap();
        assert!(connector.connect().is_err());
    }
}
