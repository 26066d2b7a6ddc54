//! Client builder for fluent construction.
//!
//! The [`GatewayClientBuilder`] collects configuration and an optional
//! observer, then binds them to a connector.

use std::sync::Arc;
use std::time::Duration;

use grpcweb_transport::traits::Connector;

use crate::client::GatewayClient;
use crate::config::{CallOption, ClientConfig};
use crate::observer::{CallObserver, NoopObserver};

/// Builder for [`GatewayClient`].
///
/// # Example
///
/// ```rust
/// use grpcweb_client::{CallOption, GatewayClientBuilder, TracingObserver};
/// use grpcweb_transport::memory::ScriptedConnector;
/// use std::time::Duration;
///
/// let client = GatewayClientBuilder::new()
///     .unary_timeout(Duration::from_millis(500))
///     .default_option(CallOption::header("x-client", "demo"))
///     .observer(TracingObserver)
///     .build(ScriptedConnector::new());
///
/// assert_eq!(client.config().unary_timeout, Some(Duration::from_millis(500)));
/// ```
pub struct GatewayClientBuilder {
    config: ClientConfig,
    observer: Arc<dyn CallObserver>,
}

impl Default for GatewayClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayClientBuilder {
    /// Create a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            observer: Arc::new(NoopObserver),
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the unary deadline.
    #[must_use]
    pub fn unary_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_unary_timeout(timeout);
        self
    }

    /// Set the streaming deadline.
    #[must_use]
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_stream_timeout(timeout);
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.config = self.config.with_event_buffer(capacity);
        self
    }

    /// Add an option applied to every call.
    #[must_use]
    pub fn default_option(mut self, option: CallOption) -> Self {
        self.config = self.config.with_default_option(option);
        self
    }

    /// Accept `readable` notifications from the transport.
    #[must_use]
    pub fn expect_readable(mut self, expect: bool) -> Self {
        self.config = self.config.with_expect_readable(expect);
        self
    }

    /// Set the lifecycle observer.
    #[must_use]
    pub fn observer(mut self, observer: impl CallObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Set a shared lifecycle observer.
    #[must_use]
    pub fn shared_observer(mut self, observer: Arc<dyn CallObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Bind the configuration to a connector.
    pub fn build<C: Connector>(self, connector: C) -> GatewayClient<C> {
        GatewayClient::from_parts(connector, self.config, self.observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grpcweb_transport::memory::ScriptedConnector;

    #[test]
    fn test_builder_applies_settings() {
        let client = GatewayClientBuilder::new()
            .stream_timeout(Duration::from_secs(10))
            .event_buffer(4)
            .expect_readable(true)
            .build(ScriptedConnector::new());

        let config = client.config();
        assert_eq!(config.stream_timeout, Some(Duration::from_secs(10)));
        assert_eq!(config.event_buffer, 4);
        assert!(config.expect_readable);
        assert_eq!(config.unary_timeout, Some(Duration::from_secs(1)));
    }
}
