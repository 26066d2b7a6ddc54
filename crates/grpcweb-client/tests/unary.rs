//! Unary call behavior against scripted transports.

use std::time::Duration;

use bytes::Bytes;
use grpcweb_client::{CallOption, ClientConfig, GatewayClient};
use grpcweb_core::{
    CallError, CodecError, Metadata, Prost, ProtoMessage, Status, StatusCode, TransportSignal,
};
use grpcweb_transport::HttpMethod;
use grpcweb_transport::event::{DataEvent, TransportEvent};
use grpcweb_transport::memory::{Script, ScriptedConnector};
use pretty_assertions::assert_eq;

const ENDPOINT: &str = "/pkg.Service/Get";

fn request() -> Vec<u8> {
    vec![0x01]
}

/// A request that refuses to serialize.
struct Unserializable;

impl ProtoMessage for Unserializable {
    fn serialize(&self) -> Result<Bytes, CodecError> {
        Err(CodecError::new("field out of range"))
    }

    fn deserialize(&mut self, _bytes: &[u8]) -> Result<(), CodecError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_message_with_ok_trailer() {
    let connector = ScriptedConnector::new();
    let recorder = connector.push(Script::new().message_with_trailer(vec![0xaa], &Status::ok()));
    let client = GatewayClient::new(connector);

    let response = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap();
    assert_eq!(response, Bytes::from_static(&[0xaa]));

    let recorded = recorder.snapshot();
    assert_eq!(recorded.endpoint.as_deref(), Some(ENDPOINT));
    assert_eq!(recorded.method, Some(HttpMethod::Post));
    assert_eq!(recorded.body, Some(Bytes::from_static(&[0x01])));
    assert!(recorded.aborted, "transport is torn down after resolution");
}

#[tokio::test]
async fn test_not_found_trailer() {
    let connector = ScriptedConnector::new();
    connector.push(Script::new().trailer(&Status::new(StatusCode::NotFound, "missing")));
    let client = GatewayClient::new(connector);

    let err = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap_err();
    assert_eq!(err, CallError::Status(Status::new(StatusCode::NotFound, "missing")));
    assert_eq!(err.code(), StatusCode::NotFound);
}

#[tokio::test]
async fn test_ok_trailer_without_message_is_empty_response() {
    let connector = ScriptedConnector::new();
    connector.push(Script::new().trailer(&Status::ok()));
    let client = GatewayClient::new(connector);

    let response = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap();
    assert!(response.is_empty());
}

#[tokio::test]
async fn test_failing_trailer_in_same_event_wins() {
    let connector = ScriptedConnector::new();
    connector.push(
        Script::new().message_with_trailer(vec![0xaa], &Status::new(StatusCode::Internal, "boom")),
    );
    let client = GatewayClient::new(connector);

    let err = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap_err();
    assert_eq!(err.code(), StatusCode::Internal);
}

#[tokio::test]
async fn test_first_resolving_event_wins() {
    let connector = ScriptedConnector::new();
    connector.push(
        Script::new()
            .message(vec![0xaa])
            .trailer(&Status::new(StatusCode::Internal, "late")),
    );
    let client = GatewayClient::new(connector);

    let response = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap();
    assert_eq!(response, Bytes::from_static(&[0xaa]));
}

#[tokio::test]
async fn test_malformed_trailer() {
    let connector = ScriptedConnector::new();
    connector.push(Script::new().raw_trailer(vec![0x12, 0x64, 0x41]));
    let client = GatewayClient::new(connector);

    let err = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap_err();
    assert!(matches!(err, CallError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn test_error_event_without_trailer() {
    let connector = ScriptedConnector::new();
    connector.push(Script::new().error(Some(503), "gateway unavailable"));
    let client = GatewayClient::new(connector);

    let err = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap_err();
    match &err {
        CallError::Transport {
            signal: TransportSignal::Error { http_status, .. },
        } => assert_eq!(*http_status, Some(503)),
        other => panic!("Expected transport error, got {other:?}"),
    }
    assert_eq!(err.code(), StatusCode::Unavailable);
}

#[tokio::test]
async fn test_end_and_close_without_trailer() {
    let connector = ScriptedConnector::new();
    connector.push(Script::new().end());
    connector.push(Script::new().close());
    let client = GatewayClient::new(connector);

    let first = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap_err();
    assert_eq!(first, CallError::transport(TransportSignal::End));
    let second = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap_err();
    assert_eq!(second, CallError::transport(TransportSignal::Close));
}

#[tokio::test]
async fn test_unexpected_readable_fails_unless_expected() {
    let connector = ScriptedConnector::new();
    connector.push(Script::new().event(TransportEvent::Readable));
    let client = GatewayClient::new(connector);
    let err = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap_err();
    assert_eq!(err, CallError::transport(TransportSignal::Readable));

    let connector = ScriptedConnector::new();
    connector.push(
        Script::new()
            .event(TransportEvent::Readable)
            .event(DataEvent::new(vec![0xbb], Status::ok().encode_trailer()).into()),
    );
    let client =
        GatewayClient::with_config(connector, ClientConfig::default().with_expect_readable(true));
    let response = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap();
    assert_eq!(response, Bytes::from_static(&[0xbb]));
}

#[tokio::test]
async fn test_transport_going_away_is_reported() {
    let connector = ScriptedConnector::new();
    connector.push(Script::new());
    let client = GatewayClient::new(connector);

    let err = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap_err();
    assert_eq!(err, CallError::transport(TransportSignal::Disconnected));
}

#[tokio::test]
async fn test_serialization_failure_never_touches_transport() {
    let connector = ScriptedConnector::new();
    connector.push(Script::new().trailer(&Status::ok()));
    let client = GatewayClient::new(connector);

    let err = client.unary_call(ENDPOINT, &Unserializable, &[]).await.unwrap_err();
    assert!(matches!(err, CallError::Serialization { .. }), "got {err:?}");
    assert_eq!(client.connector().pending(), 1);
}

#[tokio::test]
async fn test_framing_headers_cannot_be_overridden() {
    let connector = ScriptedConnector::new();
    let recorder = connector.push(Script::new().trailer(&Status::ok()));
    let client = GatewayClient::new(connector);

    let metadata = Metadata::from([
        ("Content-Type".to_string(), "text/plain".to_string()),
        ("x-user".to_string(), "42".to_string()),
    ]);
    client
        .unary_call(ENDPOINT, &request(), &[CallOption::metadata(metadata)])
        .await
        .unwrap();

    let recorded = recorder.snapshot();
    assert_eq!(recorded.header("content-type"), Some("application/x-protobuf"));
    assert_eq!(recorded.header("x-accept-content-transfer-encoding"), Some("base64"));
    assert_eq!(recorded.header("x-accept-response-streaming"), Some("true"));
    assert_eq!(recorded.header("x-user"), Some("42"));
}

#[tokio::test]
async fn test_default_options_run_before_call_options() {
    let connector = ScriptedConnector::new();
    let recorder = connector.push(Script::new().trailer(&Status::ok()));
    let config = ClientConfig::default().with_default_option(CallOption::header("x-tenant", "default"));
    let client = GatewayClient::with_config(connector, config);

    client
        .unary_call(ENDPOINT, &request(), &[CallOption::header("x-tenant", "override")])
        .await
        .unwrap();
    assert_eq!(recorder.snapshot().header("x-tenant"), Some("override"));
}

#[tokio::test(start_paused = true)]
async fn test_default_unary_timeout() {
    let connector = ScriptedConnector::new();
    let recorder = connector.push(Script::new().hang());
    let client = GatewayClient::new(connector);

    let err = client.unary_call(ENDPOINT, &request(), &[]).await.unwrap_err();
    assert_eq!(
        err,
        CallError::transport(TransportSignal::TimedOut(Duration::from_secs(1)))
    );
    assert_eq!(err.code(), StatusCode::DeadlineExceeded);

    let recorded = recorder.snapshot();
    assert_eq!(recorded.timeout, Some(Duration::from_secs(1)));
    assert!(recorded.aborted);
}

#[tokio::test(start_paused = true)]
async fn test_per_call_timeout_override() {
    let connector = ScriptedConnector::new();
    let recorder = connector.push(
        Script::new()
            .delay(Duration::from_secs(3))
            .message_with_trailer(vec![0xaa], &Status::ok()),
    );
    let client = GatewayClient::new(connector);

    let response = client
        .unary_call(ENDPOINT, &request(), &[CallOption::timeout(Duration::from_secs(5))])
        .await
        .unwrap();
    assert_eq!(response, Bytes::from_static(&[0xaa]));
    assert_eq!(recorder.snapshot().timeout, Some(Duration::from_secs(5)));
}

#[tokio::test(start_paused = true)]
async fn test_response_buffered_before_deadline_is_delivered() {
    let connector = ScriptedConnector::new();
    let recorder = connector.push(Script::new().message_with_trailer(vec![0xaa], &Status::ok()));
    let client = GatewayClient::new(connector);

    let call = client.start_unary(ENDPOINT, &request(), &[]).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(recorder.snapshot().events_emitted, 1);

    let response = call.wait().await.unwrap();
    assert_eq!(response, Bytes::from_static(&[0xaa]));
}

#[tokio::test(start_paused = true)]
async fn test_abort_while_waiting() {
    let connector = ScriptedConnector::new();
    let recorder = connector.push(Script::new().hang());
    let client = GatewayClient::with_config(connector, ClientConfig::default().without_unary_timeout());

    let call = client.start_unary(ENDPOINT, &request(), &[]).unwrap();
    let handle = call.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();
    });

    let err = call.wait().await.unwrap_err();
    assert!(err.is_aborted());
    assert_eq!(err.code(), StatusCode::Cancelled);
    assert!(recorder.snapshot().aborted);
}

#[tokio::test]
async fn test_typed_unary() {
    let connector = ScriptedConnector::new();
    // google.protobuf.StringValue { value: "hi" }
    connector.push(Script::new().message_with_trailer(vec![0x0a, 0x02, b'h', b'i'], &Status::ok()));
    connector.push(Script::new().message_with_trailer(vec![0x0a, 0x05, b'h'], &Status::ok()));
    let client = GatewayClient::new(connector);

    let request = Prost(String::from("ping"));
    let response: Prost<String> = client.unary(ENDPOINT, &request, &[]).await.unwrap();
    assert_eq!(response.0, "hi");

    let err = client
        .unary::<_, Prost<String>>(ENDPOINT, &request, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::Deserialization { .. }), "got {err:?}");
}
