//! The gateway client.
//!
//! [`GatewayClient`] turns a request into a dispatched call: it serializes
//! the payload, obtains a fresh transport from its [`Connector`], applies
//! options, framing headers and the deadline, and hands the transport's
//! event stream to a unary or streaming coordinator.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use grpcweb_core::error::{CallError, DecodeError};
use grpcweb_core::message::ProtoMessage;
use grpcweb_core::status::Status;
use grpcweb_transport::demux::Demultiplexer;
use grpcweb_transport::event::event_channel;
use grpcweb_transport::traits::{Connector, FRAMING_HEADERS, HttpMethod, Transport};
use tracing::debug;

use crate::call::ActiveCall;
use crate::config::{Call, CallOption, ClientConfig, PendingCall};
use crate::observer::{CallInfo, CallKind, CallObserver, NoopObserver};
use crate::stream::StreamReader;
use crate::unary::UnaryCall;

/// A client issuing gRPC-Web calls through a [`Connector`].
///
/// Every call gets its own transport, event channel and coordinator; the
/// client itself holds no per-call state and can be shared across tasks.
/// Use [`GatewayClientBuilder`](crate::GatewayClientBuilder) to install an
/// observer.
///
/// # Example
///
/// ```rust
/// use grpcweb_client::GatewayClient;
/// use grpcweb_core::Status;
/// use grpcweb_transport::memory::{Script, ScriptedConnector};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), grpcweb_core::CallError> {
/// let connector = ScriptedConnector::new();
/// connector.push(Script::new().message_with_trailer(vec![0xaa], &Status::ok()));
///
/// let client = GatewayClient::new(connector);
/// let response = client.unary_call("/pkg.Service/Get", &vec![0x01_u8], &[]).await?;
/// assert_eq!(&response[..], &[0xaa]);
/// # Ok(())
/// # }
/// ```
pub struct GatewayClient<C: Connector> {
    connector: C,
    config: ClientConfig,
    observer: Arc<dyn CallObserver>,
    next_id: AtomicU64,
}

impl<C: Connector> GatewayClient<C> {
    /// Create a client with the default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, ClientConfig::default())
    }

    /// Create a client with the given configuration.
    pub fn with_config(connector: C, config: ClientConfig) -> Self {
        Self::from_parts(connector, config, Arc::new(NoopObserver))
    }

    pub(crate) fn from_parts(
        connector: C,
        config: ClientConfig,
        observer: Arc<dyn CallObserver>,
    ) -> Self {
        Self {
            connector,
            config,
            observer,
            next_id: AtomicU64::new(1),
        }
    }

    /// The client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The connector producing transports.
    #[must_use]
    pub const fn connector(&self) -> &C {
        &self.connector
    }

    /// Issue a unary call and wait for its response bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Serialization`] if the request cannot be
    /// serialized (the transport is never created), or the error the call
    /// resolved with.
    pub async fn unary_call<Req>(
        &self,
        endpoint: &str,
        request: &Req,
        options: &[CallOption],
    ) -> Result<Bytes, CallError>
    where
        Req: ProtoMessage + ?Sized,
    {
        self.start_unary(endpoint, request, options)?.wait().await
    }

    /// Issue a unary call and deserialize its response.
    ///
    /// # Errors
    ///
    /// As [`GatewayClient::unary_call`], plus
    /// [`CallError::Deserialization`] if the response does not decode.
    pub async fn unary<Req, Resp>(
        &self,
        endpoint: &str,
        request: &Req,
        options: &[CallOption],
    ) -> Result<Resp, CallError>
    where
        Req: ProtoMessage + ?Sized,
        Resp: ProtoMessage + Default,
    {
        let bytes = self.unary_call(endpoint, request, options).await?;
        let mut response = Resp::default();
        response
            .deserialize(&bytes)
            .map_err(|e| CallError::deserialization(e.to_string()))?;
        Ok(response)
    }

    /// Dispatch a unary call without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be serialized or the transport
    /// refuses it.
    pub fn start_unary<Req>(
        &self,
        endpoint: &str,
        request: &Req,
        options: &[CallOption],
    ) -> Result<UnaryCall<C::Transport>, CallError>
    where
        Req: ProtoMessage + ?Sized,
    {
        let call = prepare(endpoint, request, options)?;
        self.dispatch(call, CallKind::Unary).map(UnaryCall::new)
    }

    /// Issue a server-streaming call.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be serialized or the transport
    /// refuses it. Failures after dispatch surface through the reader.
    pub fn server_streaming<Req>(
        &self,
        endpoint: &str,
        request: &Req,
        options: &[CallOption],
    ) -> Result<StreamReader<C::Transport>, CallError>
    where
        Req: ProtoMessage + ?Sized,
    {
        let call = prepare(endpoint, request, options)?;
        self.dispatch(call, CallKind::ServerStreaming)
            .map(StreamReader::new)
    }

    /// Dispatch a prepared unary call.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport refuses the call.
    pub fn start_unary_call(&self, call: Call) -> Result<UnaryCall<C::Transport>, CallError> {
        self.dispatch(call, CallKind::Unary).map(UnaryCall::new)
    }

    /// Dispatch a prepared server-streaming call.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport refuses the call.
    pub fn start_streaming_call(
        &self,
        call: Call,
    ) -> Result<StreamReader<C::Transport>, CallError> {
        self.dispatch(call, CallKind::ServerStreaming)
            .map(StreamReader::new)
    }

    /// Decode a trailer frame.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the bytes are not a valid status.
    pub fn parse_status(trailer: &[u8]) -> Result<Status, DecodeError> {
        Status::decode(trailer)
    }

    fn dispatch(&self, call: Call, kind: CallKind) -> Result<ActiveCall<C::Transport>, CallError> {
        let default_timeout = match kind {
            CallKind::Unary => self.config.unary_timeout,
            CallKind::ServerStreaming => self.config.stream_timeout,
        };
        let mut pending = PendingCall::new(default_timeout);
        for option in self.config.default_options.iter().chain(&call.options) {
            option.apply(&mut pending);
        }

        let mut transport = self.connector.connect()?;
        for (name, value) in pending.headers() {
            transport.set_header(name, value);
        }
        for (name, value) in FRAMING_HEADERS {
            transport.set_header(name, value);
        }
        if let Some(timeout) = pending.timeout() {
            transport.set_timeout(timeout);
        }

        let info = CallInfo {
            id: self.next_id(),
            endpoint: Arc::from(call.endpoint.as_str()),
            kind,
        };
        let (sink, events) = event_channel(self.config.event_buffer);
        debug!(
            call_id = info.id,
            endpoint = %call.endpoint,
            %kind,
            body_len = call.body.len(),
            timeout = ?pending.timeout(),
            "dispatching call"
        );
        transport.send(&call.endpoint, HttpMethod::Post, call.body, sink)?;
        self.observer.on_dispatch(&info);

        let demux = Demultiplexer::new(events).expect_readable(self.config.expect_readable);
        Ok(ActiveCall::new(
            info,
            transport,
            demux,
            pending.timeout(),
            Arc::clone(&self.observer),
        ))
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl<C: Connector + fmt::Debug> fmt::Debug for GatewayClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("connector", &self.connector)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Serialize the request into a [`Call`].
fn prepare<Req>(endpoint: &str, request: &Req, options: &[CallOption]) -> Result<Call, CallError>
where
    Req: ProtoMessage + ?Sized,
{
    let body = request
        .serialize()
        .map_err(|e| CallError::serialization(e.to_string()))?;
    Ok(Call {
        endpoint: endpoint.to_string(),
        body,
        options: options.to_vec(),
    })
}
