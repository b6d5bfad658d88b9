//! Client behaviour against deterministic stub transports.

mod support;

use nlu_intent_client::{
    CallError, CallOptions, Client, ClientBuilder, ClientConfig, ConnectionError, Credentials,
    DetectIntentRequest, Environment, StatusCode, TransportError,
};
use std::sync::Arc;
use std::time::Duration;
use support::{Behavior, StubTransport};

fn config() -> ClientConfig {
    ClientConfig::new("stub:443")
}

fn hi() -> DetectIntentRequest {
    DetectIntentRequest::new("p1", "s1", "Hi", "en")
}

fn client_with(stub: Arc<StubTransport>) -> Client {
    Client::with_transport(config(), stub).expect("valid config")
}

#[test]
fn insecure_configs_connect() {
    for endpoint in ["stub:443", "localhost:50051", "http://gateway:8080", "grpc://10.0.0.1:9000"] {
        let result = Client::connect(ClientConfig::new(endpoint));
        assert!(result.is_ok(), "{endpoint}: {result:?}");
    }
}

#[test]
fn secure_without_credentials_fails() {
    let err = Client::connect(config().with_secure(true)).unwrap_err();
    assert_eq!(err, ConnectionError::MissingCredentials);

    let err = Client::connect(config().with_secure(true).with_credentials(Credentials::new()))
        .unwrap_err();
    assert_eq!(err, ConnectionError::MissingCredentials);
}

#[test]
fn secure_with_token_connects_without_io() {
    let stub = Arc::new(StubTransport::echoing("greeting", 0.9, "Hello!"));
    let client = ClientBuilder::new("nlu.example.com:443")
        .secure(true)
        .credentials(Credentials::token("abc"))
        .environment(Environment::Production)
        .transport(stub.clone())
        .connect();
    assert!(client.is_ok());
    assert_eq!(stub.calls(), 0);
}

#[test]
fn malformed_endpoint_is_rejected() {
    let err = Client::connect(ClientConfig::new("not an endpoint")).unwrap_err();
    assert!(matches!(err, ConnectionError::InvalidEndpoint { .. }));
}

#[tokio::test]
async fn scenario_greeting_is_returned() {
    let stub = Arc::new(StubTransport::echoing("greeting", 0.95, "Hello!"));
    let client = client_with(stub.clone());

    let response = client.detect_intent(&hi()).await.unwrap();
    assert_eq!(response.intent_name, "greeting");
    assert_eq!(response.confidence, 0.95);
    assert_eq!(response.fulfillment_text, "Hello!");

    let sent = stub.last_request().unwrap();
    assert_eq!(sent.session, "projects/p1/agent/sessions/s1");
    let text = sent.query_input.unwrap().text.unwrap();
    assert_eq!((text.text.as_str(), text.language_code.as_str()), ("Hi", "en"));
    assert_eq!(
        stub.last_procedure().as_deref(),
        Some("/ondewo.nlu.Sessions/DetectIntent")
    );
}

#[tokio::test]
async fn identical_requests_yield_identical_responses() {
    let stub = Arc::new(StubTransport::echoing("greeting", 0.95, "Hello!"));
    let client = client_with(stub.clone());

    let first = client.detect_intent(&hi()).await.unwrap();
    let second = client.detect_intent(&hi()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn empty_fields_fail_without_a_remote_call() {
    let stub = Arc::new(StubTransport::echoing("greeting", 0.95, "Hello!"));
    let client = client_with(stub.clone());

    let requests = [
        DetectIntentRequest::new("", "s1", "Hi", "en"),
        DetectIntentRequest::new("p1", "", "Hi", "en"),
        DetectIntentRequest::new("p1", "s1", "", "en"),
        DetectIntentRequest::new("p1", "s1", "Hi", ""),
        DetectIntentRequest::new("p1", "s1", "   ", "en"),
    ];
    for request in &requests {
        let err = client.detect_intent(request).await.unwrap_err();
        assert!(matches!(err, CallError::InvalidRequest { .. }), "{request:?}: {err:?}");
    }
    assert_eq!(stub.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn scenario_hang_times_out() {
    let stub = Arc::new(StubTransport::new(Behavior::Hang(Duration::from_secs(3))));
    let client = Client::with_transport(config().with_timeout(Duration::from_secs(1)), stub.clone())
        .unwrap();

    let started = tokio::time::Instant::now();
    let err = client.detect_intent(&hi()).await.unwrap_err();
    assert_eq!(err, CallError::Transport("timeout".into()));
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(stub.calls(), 1, "no internal retry");
}

#[tokio::test(start_paused = true)]
async fn per_call_timeout_overrides_config() {
    let stub = Arc::new(StubTransport::new(Behavior::Hang(Duration::from_secs(3))));
    let client = client_with(stub);

    let err = client
        .detect_intent_with_timeout(&hi(), Duration::from_millis(500))
        .await
        .unwrap_err();
    assert_eq!(err, CallError::Transport("timeout".into()));
}

#[tokio::test]
async fn metadata_from_config_and_call_is_forwarded() {
    let stub = Arc::new(StubTransport::echoing("greeting", 0.95, "Hello!"));
    let client = Client::with_transport(config().with_metadata("x-tenant", "acme"), stub.clone())
        .unwrap();

    let options = CallOptions::new(Duration::from_secs(2)).with_metadata("x-request-id", "req-7");
    client.detect_intent_with_options(&hi(), options).await.unwrap();

    let sent = stub.last_options().unwrap();
    assert_eq!(sent.timeout, Duration::from_secs(2));
    assert_eq!(
        sent.metadata,
        vec![
            ("x-tenant".to_string(), "acme".to_string()),
            ("x-request-id".to_string(), "req-7".to_string()),
        ]
    );
}

#[tokio::test]
async fn bad_call_options_fail_without_a_remote_call() {
    let stub = Arc::new(StubTransport::echoing("greeting", 0.95, "Hello!"));
    let client = client_with(stub.clone());

    let err = client
        .detect_intent_with_timeout(&hi(), Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, CallError::InvalidRequest { ref field, .. } if field == "timeout"));

    let options = CallOptions::new(Duration::from_secs(1)).with_metadata("grpc-timeout", "1S");
    let err = client.detect_intent_with_options(&hi(), options).await.unwrap_err();
    assert!(matches!(err, CallError::InvalidRequest { ref field, .. } if field == "metadata"));
    assert_eq!(stub.calls(), 0);
}

#[test]
fn zero_timeout_is_refused_at_connect() {
    let err = Client::connect(config().with_timeout(Duration::ZERO)).unwrap_err();
    assert!(matches!(err, ConnectionError::InvalidSetting { .. }));
}

#[tokio::test]
async fn scenario_remote_not_found() {
    let stub = Arc::new(StubTransport::failing(StatusCode::NotFound, "session s1 unknown"));
    let client = client_with(stub.clone());

    let err = client.detect_intent(&hi()).await.unwrap_err();
    assert_eq!(
        err,
        CallError::Remote {
            code: StatusCode::NotFound,
            message: "session s1 unknown".into()
        }
    );
    assert_eq!(err.status_code().map(|c| c.name()), Some("NOT_FOUND"));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn unreachable_transport_is_a_transport_error() {
    let stub = Arc::new(StubTransport::new(Behavior::Fail(TransportError::Unavailable(
        "connection refused".into(),
    ))));
    let err = client_with(stub).detect_intent(&hi()).await.unwrap_err();
    assert_eq!(err, CallError::Transport("connection refused".into()));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn malformed_reply_is_a_decode_error() {
    let stub = Arc::new(StubTransport::new(Behavior::Reply(bytes::Bytes::from_static(
        &[0xff, 0xff, 0xff],
    ))));
    let err = client_with(stub).detect_intent(&hi()).await.unwrap_err();
    assert!(matches!(err, CallError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn out_of_range_confidence_is_a_decode_error() {
    let stub = Arc::new(StubTransport::echoing("greeting", 1.5, "Hello!"));
    let err = client_with(stub).detect_intent(&hi()).await.unwrap_err();
    assert!(matches!(err, CallError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn client_is_shared_across_tasks() {
    let stub = Arc::new(StubTransport::echoing("greeting", 0.95, "Hello!"));
    let client = client_with(stub.clone());

    let tasks = (0..8).map(|i| {
        let client = client.clone();
        tokio::spawn(async move {
            let request = DetectIntentRequest::new("p1", format!("s{i}"), "Hi", "en");
            client.detect_intent(&request).await
        })
    });
    for outcome in futures::future::join_all(tasks).await {
        assert_eq!(outcome.unwrap().unwrap().intent_name, "greeting");
    }
    assert_eq!(stub.calls(), 8);
}

#[tokio::test]
async fn grpc_transport_reports_unreachable_host() {
    let client = Client::connect(
        ClientConfig::new("127.0.0.1:1")
            .with_timeout(Duration::from_secs(5))
            .with_connect_timeout(Duration::from_secs(2)),
    )
    .unwrap();
    let err = client.detect_intent(&hi()).await.unwrap_err();
    assert!(matches!(err, CallError::Transport(_)), "{err:?}");
}
