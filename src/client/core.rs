use crate::config::ClientConfig;
use crate::error::{CallError, ConnectionError};
use crate::transport::{check_metadata, CallOptions, RpcTransport};
use crate::types::{DetectIntentRequest, DetectIntentResponse};
use bytes::Bytes;
use prost::Message;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Intent-detection client.
///
/// Holds the validated configuration and a shared handle to the transport.
/// Cloning is cheap and clones share the transport; the configuration is
/// immutable after [`Client::connect`], so concurrent use needs no locking.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Arc<dyn RpcTransport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Client {
    /// Validates `config` and prepares the transport it selects.
    ///
    /// No network I/O happens here; the connection is established on the first call.
    pub fn connect(config: ClientConfig) -> Result<Self, ConnectionError> {
        let endpoint = config.validate()?;
        let transport = crate::transport::from_config(&config, &endpoint)?;
        info!(
            endpoint = %config.endpoint,
            secure = config.secure,
            transport = ?config.transport,
            "intent client ready"
        );
        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    /// Validates `config` exactly like [`Client::connect`] but uses the supplied transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn RpcTransport>,
    ) -> Result<Self, ConnectionError> {
        config.validate()?;
        debug!(endpoint = %config.endpoint, "intent client ready with custom transport");
        Ok(Self {
            config: Arc::new(config),
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Issues one `DetectIntent` call bounded by the configured timeout.
    pub async fn detect_intent(
        &self,
        request: &DetectIntentRequest,
    ) -> Result<DetectIntentResponse, CallError> {
        self.detect_intent_with_timeout(request, self.config.timeout)
            .await
    }

    /// Issues one `DetectIntent` call bounded by `timeout`.
    ///
    /// Nothing is retried: on expiry the call fails with `CallError::Transport("timeout")`.
    pub async fn detect_intent_with_timeout(
        &self,
        request: &DetectIntentRequest,
        timeout: Duration,
    ) -> Result<DetectIntentResponse, CallError> {
        self.detect_intent_with_options(request, CallOptions::new(timeout))
            .await
    }

    /// Issues one `DetectIntent` call with explicit per-call options.
    ///
    /// Metadata from the configuration is sent first, followed by `options.metadata`.
    pub async fn detect_intent_with_options(
        &self,
        request: &DetectIntentRequest,
        options: CallOptions,
    ) -> Result<DetectIntentResponse, CallError> {
        if options.timeout.is_zero() {
            return Err(CallError::invalid_request("timeout", "must be greater than zero"));
        }
        for (key, value) in &options.metadata {
            check_metadata(key, value).map_err(|message| CallError::invalid_request("metadata", message))?;
        }
        let timeout = options.timeout;
        let mut metadata = self.config.metadata.clone();
        metadata.extend(options.metadata);
        let options = CallOptions { timeout, metadata };

        let wire = request.to_wire()?;
        let payload = Bytes::from(wire.encode_to_vec());

        debug!(
            session = %wire.session,
            bytes = payload.len(),
            procedure = %self.config.procedure,
            "sending detect-intent request"
        );

        let reply = tokio::time::timeout(
            timeout,
            self.transport
                .call(&self.config.procedure, payload, &options),
        )
        .await
        .map_err(|_| CallError::timeout())
        .and_then(|outcome| outcome.map_err(CallError::from));

        let bytes = match reply {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(session = %wire.session, error = %err, "detect-intent call failed");
                return Err(err);
            }
        };

        let response = DetectIntentResponse::decode(&bytes)?;
        debug!(
            intent = %response.intent_name,
            confidence = response.confidence,
            "detect-intent call succeeded"
        );
        Ok(response)
    }
}
