//! 传输层：通用 RPC 调用接口与 gRPC / gRPC-Web 两种实现。
//!
//! Transport layer.
//!
//! [`RpcTransport`] is the seam between the client and the wire: it moves one
//! already-encoded protobuf payload to a named remote procedure and returns the
//! reply bytes. The client owns validation, encoding, decoding and the overall
//! timeout; transports own connection management, TLS and framing.

pub mod grpc;
#[cfg(feature = "grpc-web")]
pub mod grpc_web;

pub use grpc::GrpcTransport;
#[cfg(feature = "grpc-web")]
pub use grpc_web::GrpcWebTransport;

use crate::config::{ClientConfig, Endpoint, TransportKind};
use crate::error::ConnectionError;
use crate::status_code::StatusCode;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Per-call options handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Deadline propagated to the server. The client enforces it locally as well.
    pub timeout: Duration,
    /// Extra ASCII metadata sent with the call.
    pub metadata: Vec<(String, String)>,
}

impl CallOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }
}

/// Checks that a metadata pair can be sent as-is on both gRPC and gRPC-Web.
///
/// Keys are lowercase header tokens; `grpc-*`, `authorization` and the content
/// headers are owned by the transports. Values are visible ASCII or spaces.
pub(crate) fn check_metadata(key: &str, value: &str) -> Result<(), String> {
    const RESERVED: [&str; 5] = ["authorization", "content-type", "accept", "te", "x-grpc-web"];

    let valid_key = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'-' | b'_' | b'.'));
    if !valid_key {
        return Err(format!("invalid metadata key '{key}'"));
    }
    if key.starts_with("grpc-") || RESERVED.contains(&key) || key.ends_with("-bin") {
        return Err(format!("metadata key '{key}' is reserved"));
    }
    if !value.bytes().all(|b| b == b' ' || b.is_ascii_graphic()) {
        return Err(format!("invalid metadata value for '{key}'"));
    }
    Ok(())
}

/// Failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("timeout")]
    Timeout,

    /// The server answered with a non-OK status.
    #[error("{code}: {message}")]
    Status { code: StatusCode, message: String },

    /// The reply violated the wire protocol (framing, missing trailers).
    #[error("protocol violation: {0}")]
    Protocol(String),
}

/// Generic unary RPC capability.
///
/// Implementations must be safe to call concurrently from several tasks; the
/// shipped transports multiplex calls over a shared connection pool, so callers
/// never need to serialize access externally.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(
        &self,
        procedure: &str,
        payload: Bytes,
        options: &CallOptions,
    ) -> Result<Bytes, TransportError>;
}

/// Builds the transport selected by `config.transport`. Performs no network I/O.
pub(crate) fn from_config(
    config: &ClientConfig,
    endpoint: &Endpoint,
) -> Result<Arc<dyn RpcTransport>, ConnectionError> {
    match config.transport {
        TransportKind::Grpc => Ok(Arc::new(GrpcTransport::new(config, endpoint)?)),
        #[cfg(feature = "grpc-web")]
        TransportKind::GrpcWeb => Ok(Arc::new(GrpcWebTransport::new(config, endpoint)?)),
        #[cfg(not(feature = "grpc-web"))]
        TransportKind::GrpcWeb => Err(ConnectionError::invalid_endpoint(
            &config.endpoint,
            "gRPC-Web transport requires the `grpc-web` feature",
        )),
    }
}
