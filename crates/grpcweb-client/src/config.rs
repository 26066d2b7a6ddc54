//! Call configuration.
//!
//! A [`CallOption`] mutates the [`PendingCall`] assembled before dispatch.
//! Options run in the order supplied: client-wide defaults from
//! [`ClientConfig`] first, then the per-call options. Framing headers are
//! written afterwards, so no option can override them.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use grpcweb_core::status::Metadata;
use grpcweb_transport::event::DEFAULT_EVENT_BUFFER;

/// Default deadline of unary calls.
pub const DEFAULT_UNARY_TIMEOUT: Duration = Duration::from_secs(1);

/// Request settings collected from call options before dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingCall {
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl PendingCall {
    /// Start from the given default timeout.
    #[must_use]
    pub const fn new(timeout: Option<Duration>) -> Self {
        Self {
            headers: Vec::new(),
            timeout,
        }
    }

    /// Add a request header. A later value for the same name wins.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Replace the call deadline. `None` disables it.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Headers in the order they were set.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The call deadline.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// A clonable mutator applied to a [`PendingCall`].
///
/// # Example
///
/// ```rust
/// use grpcweb_client::config::{CallOption, PendingCall};
/// use std::time::Duration;
///
/// let mut pending = PendingCall::new(None);
/// CallOption::header("x-user", "42").apply(&mut pending);
/// CallOption::timeout(Duration::from_secs(5)).apply(&mut pending);
///
/// assert_eq!(pending.headers(), &[("x-user".to_string(), "42".to_string())]);
/// assert_eq!(pending.timeout(), Some(Duration::from_secs(5)));
/// ```
#[derive(Clone)]
pub struct CallOption {
    apply: Arc<dyn Fn(&mut PendingCall) + Send + Sync>,
}

impl CallOption {
    /// Wrap an arbitrary mutator.
    pub fn from_fn(f: impl Fn(&mut PendingCall) + Send + Sync + 'static) -> Self {
        Self { apply: Arc::new(f) }
    }

    /// Send every metadata entry as a request header.
    #[must_use]
    pub fn metadata(metadata: Metadata) -> Self {
        Self::from_fn(move |call| {
            for (name, value) in &metadata {
                call.set_header(name.clone(), value.clone());
            }
        })
    }

    /// Send one request header.
    pub fn header(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        Self::from_fn(move |call| call.set_header(name.clone(), value.clone()))
    }

    /// Set the call deadline.
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self::from_fn(move |call| call.set_timeout(Some(timeout)))
    }

    /// Remove any call deadline.
    #[must_use]
    pub fn no_timeout() -> Self {
        Self::from_fn(|call| call.set_timeout(None))
    }

    /// Apply this option.
    pub fn apply(&self, call: &mut PendingCall) {
        (self.apply)(call);
    }
}

impl fmt::Debug for CallOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallOption").finish_non_exhaustive()
    }
}

/// A request ready for dispatch.
#[derive(Debug, Clone)]
pub struct Call {
    /// Endpoint path of the RPC, e.g. `/pkg.Service/Method`.
    pub endpoint: String,
    /// Serialized request.
    pub body: Bytes,
    /// Options applied after the client defaults.
    pub options: Vec<CallOption>,
}

impl Call {
    /// Create a call with no options.
    pub fn new(endpoint: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            endpoint: endpoint.into(),
            body: body.into(),
            options: Vec::new(),
        }
    }

    /// Add an option.
    #[must_use]
    pub fn with_option(mut self, option: CallOption) -> Self {
        self.options.push(option);
        self
    }
}

/// Client-wide call settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Deadline of unary calls.
    pub unary_timeout: Option<Duration>,
    /// Deadline of streaming calls.
    pub stream_timeout: Option<Duration>,
    /// Capacity of each call's event channel.
    pub event_buffer: usize,
    /// Options applied to every call before its own options.
    pub default_options: Vec<CallOption>,
    /// Treat `readable` notifications as informational instead of a failure.
    pub expect_readable: bool,
}

impl ClientConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the unary deadline.
    #[must_use]
    pub const fn with_unary_timeout(mut self, timeout: Duration) -> Self {
        self.unary_timeout = Some(timeout);
        self
    }

    /// Disable the unary deadline.
    #[must_use]
    pub const fn without_unary_timeout(mut self) -> Self {
        self.unary_timeout = None;
        self
    }

    /// Set the streaming deadline.
    #[must_use]
    pub const fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = Some(timeout);
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub const fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Add an option applied to every call.
    #[must_use]
    pub fn with_default_option(mut self, option: CallOption) -> Self {
        self.default_options.push(option);
        self
    }

    /// Accept `readable` notifications.
    #[must_use]
    pub const fn with_expect_readable(mut self, expect: bool) -> Self {
        self.expect_readable = expect;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            unary_timeout: Some(DEFAULT_UNARY_TIMEOUT),
            stream_timeout: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
            default_options: Vec::new(),
            expect_readable: false,
        }
    }
}
