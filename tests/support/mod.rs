//! Stub transports shared by integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use nlu_intent_client::proto;
use nlu_intent_client::{CallOptions, RpcTransport, StatusCode, TransportError};
use prost::Message;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the stub does when called.
#[derive(Debug, Clone)]
pub enum Behavior {
    Reply(Bytes),
    Fail(TransportError),
    Hang(Duration),
}

/// Deterministic transport that records every call it receives.
pub struct StubTransport {
    behavior: Behavior,
    calls: AtomicUsize,
    last_payload: Mutex<Option<Bytes>>,
    last_procedure: Mutex<Option<String>>,
    last_options: Mutex<Option<CallOptions>>,
}

impl StubTransport {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            last_payload: Mutex::new(None),
            last_procedure: Mutex::new(None),
            last_options: Mutex::new(None),
        }
    }

    /// Replies with an intent match built from the given fields.
    pub fn echoing(intent: &str, confidence: f32, fulfillment: &str) -> Self {
        Self::new(Behavior::Reply(Bytes::from(
            reply(intent, confidence, fulfillment).encode_to_vec(),
        )))
    }

    pub fn failing(code: StatusCode, message: &str) -> Self {
        Self::new(Behavior::Fail(TransportError::Status {
            code,
            message: message.to_string(),
        }))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<proto::DetectIntentRequest> {
        let payload = self.last_payload.lock().unwrap().clone()?;
        Some(proto::DetectIntentRequest::decode(payload).expect("stub received valid protobuf"))
    }

    pub fn last_procedure(&self) -> Option<String> {
        self.last_procedure.lock().unwrap().clone()
    }

    pub fn last_options(&self) -> Option<CallOptions> {
        self.last_options.lock().unwrap().clone()
    }
}

#[async_trait]
impl RpcTransport for StubTransport {
    async fn call(
        &self,
        procedure: &str,
        payload: Bytes,
        options: &CallOptions,
    ) -> Result<Bytes, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_payload.lock().unwrap() = Some(payload);
        *self.last_procedure.lock().unwrap() = Some(procedure.to_string());
        *self.last_options.lock().unwrap() = Some(options.clone());

        match &self.behavior {
            Behavior::Reply(bytes) => Ok(bytes.clone()),
            Behavior::Fail(err) => Err(err.clone()),
            Behavior::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Err(TransportError::Unavailable("stub woke up".into()))
            }
        }
    }
}

pub fn reply(intent: &str, confidence: f32, fulfillment: &str) -> proto::DetectIntentResponse {
    proto::DetectIntentResponse {
        response_id: "resp-1".into(),
        query_result: Some(proto::QueryResult {
            query_text: "Hi".into(),
            fulfillment_text: fulfillment.into(),
            intent: Some(proto::Intent {
                name: format!("projects/p1/agent/intents/{intent}"),
                display_name: intent.into(),
            }),
            intent_detection_confidence: confidence,
            language_code: "en".into(),
            ..Default::default()
        }),
    }
}
