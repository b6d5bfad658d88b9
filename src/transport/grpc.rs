//! Native gRPC transport over HTTP/2.

use super::{CallOptions, RpcTransport, TransportError};
use crate::config::{ClientConfig, Credentials, Endpoint};
use crate::error::ConnectionError;
use crate::status_code::StatusCode;
use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes};
use std::error::Error as _;
use tokio::sync::OnceCell;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::metadata::{AsciiMetadataValue, MetadataKey};
use tonic::transport::{Certificate, Channel, ClientTlsConfig};
use tracing::debug;

/// gRPC transport backed by a lazily created tonic [`Channel`].
///
/// The channel is cheap to clone and multiplexes concurrent calls, so a single
/// transport can be shared by any number of tasks.
pub struct GrpcTransport {
    endpoint: tonic::transport::Endpoint,
    channel: OnceCell<Channel>,
    path_prefix: String,
    authorization: Option<AsciiMetadataValue>,
}

impl GrpcTransport {
    /// Prepares the channel configuration. No connection is attempted until the first call.
    pub fn new(config: &ClientConfig, endpoint: &Endpoint) -> Result<Self, ConnectionError> {
        let origin = endpoint.origin(config.secure);
        let mut builder = tonic::transport::Endpoint::from_shared(origin)
            .map_err(|e| ConnectionError::invalid_endpoint(&config.endpoint, e.to_string()))?
            .connect_timeout(config.connect_timeout)
            .tcp_nodelay(true);

        let credentials = config.credentials.as_ref();

        if config.secure {
            let tls = ClientTlsConfig::new().domain_name(endpoint.server_name());
            let tls = match credentials.and_then(Credentials::root_certificate_pem) {
                Some(pem) => tls.ca_certificate(Certificate::from_pem(pem)),
                None => tls.with_native_roots(),
            };
            builder = builder
                .tls_config(tls)
                .map_err(|e| ConnectionError::InvalidCredentials(e.to_string()))?;
        }

        let authorization = credentials
            .and_then(Credentials::token_value)
            .map(|token| {
                AsciiMetadataValue::try_from(format!("Bearer {token}")).map_err(|_| {
                    ConnectionError::InvalidCredentials("token is not valid ASCII metadata".into())
                })
            })
            .transpose()?;

        Ok(Self {
            endpoint: builder,
            channel: OnceCell::new(),
            path_prefix: endpoint.path_prefix().to_string(),
            authorization,
        })
    }

    async fn channel(&self) -> Channel {
        self.channel
            .get_or_init(|| async { self.endpoint.connect_lazy() })
            .await
            .clone()
    }
}

#[async_trait]
impl RpcTransport for GrpcTransport {
    async fn call(
        &self,
        procedure: &str,
        payload: Bytes,
        options: &CallOptions,
    ) -> Result<Bytes, TransportError> {
        let path = PathAndQuery::try_from(format!("{}{}", self.path_prefix, procedure))
            .map_err(|e| TransportError::Protocol(format!("invalid procedure '{procedure}': {e}")))?;

        let mut request = tonic::Request::new(payload);
        request.set_timeout(options.timeout);
        if let Some(value) = &self.authorization {
            request.metadata_mut().insert("authorization", value.clone());
        }
        for (key, value) in &options.metadata {
            let key = MetadataKey::from_bytes(key.as_bytes())
                .map_err(|_| TransportError::Protocol(format!("invalid metadata key '{key}'")))?;
            let value = AsciiMetadataValue::try_from(value.as_str())
                .map_err(|_| TransportError::Protocol(format!("invalid metadata value for '{key}'")))?;
            request.metadata_mut().insert(key, value);
        }

        let mut grpc = tonic::client::Grpc::new(self.channel().await);
        grpc.ready()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        debug!(%path, "issuing gRPC call");
        match grpc.unary(request, path, RawCodec).await {
            Ok(response) => Ok(response.into_inner()),
            Err(status) => Err(status_to_error(status)),
        }
    }
}

/// Statuses carrying an error source were produced locally by the connection
/// machinery; statuses without one were decoded from server trailers.
fn status_to_error(status: tonic::Status) -> TransportError {
    if status.code() == tonic::Code::DeadlineExceeded {
        return TransportError::Timeout;
    }
    match status.source() {
        Some(source) => TransportError::Unavailable(format!("{}: {}", status.message(), source)),
        None => TransportError::Status {
            code: StatusCode::from(status.code()),
            message: status.message().to_string(),
        },
    }
}

/// Passes already-encoded protobuf bytes through unchanged, so the procedure
/// name can be plain data instead of generated stubs.
#[derive(Debug, Clone, Copy, Default)]
struct RawCodec;

impl Codec for RawCodec {
    type Encode = Bytes;
    type Decode = Bytes;
    type Encoder = RawCodec;
    type Decoder = RawCodec;

    fn encoder(&mut self) -> Self::Encoder {
        RawCodec
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawCodec
    }
}

impl Encoder for RawCodec {
    type Item = Bytes;
    type Error = tonic::Status;

    fn encode(&mut self, item: Bytes, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        dst.put(item);
        Ok(())
    }
}

impl Decoder for RawCodec {
    type Item = Bytes;
    type Error = tonic::Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Bytes>, Self::Error> {
        Ok(Some(src.copy_to_bytes(src.remaining())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_statuses_keep_their_code() {
        let err = status_to_error(tonic::Status::not_found("session s1 unknown"));
        assert_eq!(
            err,
            TransportError::Status {
                code: StatusCode::NotFound,
                message: "session s1 unknown".into()
            }
        );
    }

    #[test]
    fn deadline_is_a_timeout() {
        assert_eq!(
            status_to_error(tonic::Status::deadline_exceeded("slow")),
            TransportError::Timeout
        );
    }

    #[test]
    fn construction_does_not_connect() {
        let config = ClientConfig::new("127.0.0.1:1");
        let endpoint = config.validate().unwrap();
        let transport = GrpcTransport::new(&config, &endpoint).unwrap();
        assert!(transport.channel.get().is_none());
    }

    #[test]
    fn rejects_token_that_is_not_ascii_metadata() {
        let config = ClientConfig::new("stub:443")
            .with_secure(true)
            .with_credentials(Credentials::token("line\nbreak").with_root_certificate(b"x".to_vec()));
        let endpoint = config.validate().unwrap();
        assert!(matches!(
            GrpcTransport::new(&config, &endpoint),
            Err(ConnectionError::InvalidCredentials(_))
        ));
    }
}
