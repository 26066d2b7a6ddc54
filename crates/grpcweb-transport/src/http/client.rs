//! HTTP transport client implementation.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::TransportError;
use crate::event::{DataEvent, EventSink, TransportEvent};
use crate::stream_parser::BodyDecoder;
use crate::traits::{Connector, HttpMethod, Transport};

use super::config::{CONTENT_TRANSFER_ENCODING_HEADER, HttpTransportConfig};

/// Creates an [`HttpTransport`] per call, sharing one connection pool.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: Arc<HttpTransportConfig>,
    base_url: Option<Url>,
    client: Client,
}

impl HttpConnector {
    /// Create a connector with the given configuration.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        let base_url = config
            .base_url
            .as_deref()
            .map(|raw| {
                Url::parse(raw).map_err(|e| TransportError::InvalidEndpoint {
                    endpoint: raw.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Connection {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            config: Arc::new(config),
            base_url,
            client,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }
}

impl Connector for HttpConnector {
    type Transport = HttpTransport;

    fn connect(&self) -> Result<HttpTransport, TransportError> {
        Ok(HttpTransport {
            config: Arc::clone(&self.config),
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            headers: self.config.headers.clone(),
            timeout: None,
            task: None,
        })
    }
}

/// A single gRPC-Web request over HTTP.
#[derive(Debug)]
pub struct HttpTransport {
    config: Arc<HttpTransportConfig>,
    base_url: Option<Url>,
    client: Client,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
    task: Option<JoinHandle<()>>,
}

impl HttpTransport {
    fn resolve(&self, endpoint: &str) -> Result<Url, TransportError> {
        let resolved = match &self.base_url {
            Some(base) => base.join(endpoint),
            None => Url::parse(endpoint),
        };
        resolved.map_err(|e| TransportError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    fn build_headers(&self) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            headers.insert(
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                    TransportError::InvalidHeader {
                        name: name.clone(),
                        message: e.to_string(),
                    }
                })?,
                HeaderValue::from_str(value).map_err(|e| TransportError::InvalidHeader {
                    name: name.clone(),
                    message: e.to_string(),
                })?,
            );
        }
        Ok(headers)
    }
}

impl Transport for HttpTransport {
    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = Some(timeout);
    }

    fn send(
        &mut self,
        endpoint: &str,
        method: HttpMethod,
        body: Bytes,
        events: EventSink,
    ) -> Result<(), TransportError> {
        if self.task.is_some() {
            return Err(TransportError::AlreadySent);
        }

        let url = self.resolve(endpoint)?;
        let headers = self.build_headers()?;
        let method = match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };

        debug!(%url, %method, body_len = body.len(), "sending gateway request");
        let mut request = self.client.request(method, url).headers(headers).body(body);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let max_message_size = self.config.max_message_size;
        self.task = Some(tokio::spawn(run_request(
            request,
            events,
            max_message_size,
        )));
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(task) = &self.task {
            if !task.is_finished() {
                debug!("aborting gateway request");
            }
            task.abort();
        }
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Drive one request to completion, reporting progress through `events`.
async fn run_request(request: RequestBuilder, events: EventSink, max_message_size: usize) {
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "gateway request failed");
            let _ = events
                .emit(TransportEvent::Error {
                    http_status: e.status().map(|s| s.as_u16()),
                    message: Some(format!("HTTP request failed: {e}")),
                })
                .await;
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        debug!(%status, "gateway answered with non-success status");
        let _ = events
            .emit(TransportEvent::Error {
                http_status: Some(status.as_u16()),
                message: Some(format!("Unexpected HTTP status: {status}")),
            })
            .await;
        return;
    }

    if let Err(message) = stream_body(response, &events, max_message_size).await {
        warn!(%message, "gateway response body failed");
        let _ = events
            .emit(TransportEvent::Error {
                http_status: None,
                message: Some(message),
            })
            .await;
    }
}

/// Emit every frame of the response body, then `end`.
///
/// Returns `Ok` without emitting once the consumer goes away.
async fn stream_body(
    response: Response,
    events: &EventSink,
    max_message_size: usize,
) -> Result<(), String> {
    let base64 = response
        .headers()
        .get(CONTENT_TRANSFER_ENCODING_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("base64"));
    let mut decoder = BodyDecoder::new(base64, max_message_size);
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| format!("Failed to read response body: {e}"))?;
        trace!(len = chunk.len(), "response chunk");
        for field in decoder.push(&chunk).map_err(|e| e.to_string())? {
            if events.emit(DataEvent::from(field).into()).await.is_err() {
                return Ok(());
            }
        }
    }

    if !decoder.is_idle() {
        return Err("Response body ended inside a frame".to_string());
    }
    let _ = events.emit(TransportEvent::End).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(base: Option<&str>) -> HttpConnector {
        let config = HttpTransportConfig {
            base_url: base.map(str::to_string),
            ..HttpTransportConfig::default()
        };
        HttpConnector::new(config).unwrap()
    }

    #[test]
    fn test_resolves_relative_endpoint() {
        let transport = connector(Some("http://localhost:8080/api/")).connect().unwrap();
        let url = transport.resolve("pkg.Service/Method").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/pkg.Service/Method");
    }

    #[test]
    fn test_requires_absolute_without_base() {
        let transport = connector(None).connect().unwrap();
        assert!(matches!(
            transport.resolve("/pkg.Service/Method"),
            Err(TransportError::InvalidEndpoint { .. })
        ));
        assert!(transport.resolve("http://gateway/x").is_ok());
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = HttpTransportConfig::new("not a url");
        assert!(matches!(
            HttpConnector::new(config),
            Err(TransportError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut transport = connector(None).connect().unwrap();
        transport.set_header("X-Token", "a");
        transport.set_header("x-token", "b");
        let headers = transport.build_headers().unwrap();
        assert_eq!(headers.get("x-token").unwrap(), "b");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_invalid_header_rejected_at_build() {
        let mut transport = connector(None).connect().unwrap();
        transport.set_header("bad header", "v");
        assert!(matches!(
            transport.build_headers(),
            Err(TransportError::InvalidHeader { .. })
        ));
    }
}
