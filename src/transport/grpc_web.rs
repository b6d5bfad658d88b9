//! gRPC-Web transport over HTTP/1.1.
//!
//! Each call is one `POST {base}{procedure}` carrying a single length-prefixed
//! message. The reply status comes either from response headers (trailers-only
//! replies) or from the trailer frame at the end of the body.

use super::{CallOptions, RpcTransport, TransportError};
use crate::config::{ClientConfig, Credentials, Endpoint};
use crate::error::ConnectionError;
use crate::status_code::StatusCode;
use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use tracing::debug;

const CONTENT_TYPE_GRPC_WEB: &str = "application/grpc-web+proto";
const FRAME_HEADER_LEN: usize = 5;
const TRAILER_FLAG: u8 = 0x80;
const COMPRESSED_FLAG: u8 = 0x01;

pub struct GrpcWebTransport {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GrpcWebTransport {
    pub fn new(config: &ClientConfig, endpoint: &Endpoint) -> Result<Self, ConnectionError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(
                env::var("NLU_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(32),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("NLU_PROXY_URL") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let credentials = config.credentials.as_ref();
        if config.secure {
            if let Some(pem) = credentials.and_then(Credentials::root_certificate_pem) {
                let cert = reqwest::Certificate::from_pem(pem)
                    .map_err(|e| ConnectionError::InvalidCredentials(e.to_string()))?;
                builder = builder.tls_built_in_root_certs(false).add_root_certificate(cert);
            }
        }

        let client = builder
            .build()
            .map_err(|e| ConnectionError::InvalidCredentials(e.to_string()))?;

        Ok(Self {
            client,
            base_url: endpoint.base_uri(config.secure),
            token: credentials.and_then(Credentials::token_value).map(str::to_string),
        })
    }
}

#[async_trait]
impl RpcTransport for GrpcWebTransport {
    async fn call(
        &self,
        procedure: &str,
        payload: Bytes,
        options: &CallOptions,
    ) -> Result<Bytes, TransportError> {
        let url = format!("{}{}", self.base_url, procedure);
        debug!(%url, "issuing gRPC-Web call");

        let mut request = self
            .client
            .post(&url)
            .timeout(options.timeout)
            .header(CONTENT_TYPE, CONTENT_TYPE_GRPC_WEB)
            .header("accept", CONTENT_TYPE_GRPC_WEB)
            .header("x-grpc-web", "1")
            .header("grpc-timeout", grpc_timeout(options.timeout))
            .body(encode_frame(&payload));

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        for (key, value) in &options.metadata {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        let http_status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        let trailers_only = headers.contains_key("grpc-status");
        if !trailers_only && http_status != 200 {
            return Err(TransportError::Status {
                code: StatusCode::from_http_status(http_status),
                message: format!("HTTP {http_status}"),
            });
        }

        let reply = parse_reply(&body)?;
        let trailers = if trailers_only {
            trailers_from_headers(&headers)
        } else if let Some(trailers) = reply.trailers {
            trailers
        } else {
            return Err(TransportError::Protocol("reply carries no grpc-status".into()));
        };

        let code = trailers
            .status
            .ok_or_else(|| TransportError::Protocol("unparseable grpc-status".into()))?;
        if code != StatusCode::Ok {
            return Err(TransportError::Status {
                code,
                message: trailers.message,
            });
        }

        reply
            .message
            .ok_or_else(|| TransportError::Protocol("OK reply carries no message".into()))
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Unavailable(err.to_string())
    }
}

/// Prefixes a message with the uncompressed-data flag and its big-endian length.
pub(crate) fn encode_frame(message: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + message.len());
    buf.put_u8(0);
    buf.put_u32(message.len() as u32);
    buf.put_slice(message);
    buf.freeze()
}

#[derive(Debug, Default, PartialEq)]
struct Trailers {
    status: Option<StatusCode>,
    message: String,
}

#[derive(Debug, Default, PartialEq)]
struct Reply {
    message: Option<Bytes>,
    trailers: Option<Trailers>,
}

fn parse_reply(body: &[u8]) -> Result<Reply, TransportError> {
    let mut reply = Reply::default();
    let mut rest = body;

    while !rest.is_empty() {
        if rest.len() < FRAME_HEADER_LEN {
            return Err(TransportError::Protocol("truncated frame header".into()));
        }
        let flag = rest[0];
        let len = u32::from_be_bytes([rest[1], rest[2], rest[3], rest[4]]) as usize;
        let frame = rest
            .get(FRAME_HEADER_LEN..FRAME_HEADER_LEN + len)
            .ok_or_else(|| TransportError::Protocol("truncated frame".into()))?;
        rest = &rest[FRAME_HEADER_LEN + len..];

        if flag & TRAILER_FLAG != 0 {
            reply.trailers = Some(parse_trailer_block(frame));
        } else if flag & COMPRESSED_FLAG != 0 {
            return Err(TransportError::Protocol("compressed frames are not supported".into()));
        } else if reply.message.is_some() {
            return Err(TransportError::Protocol("unary reply carries more than one message".into()));
        } else {
            reply.message = Some(Bytes::copy_from_slice(frame));
        }
    }

    Ok(reply)
}

fn parse_trailer_block(block: &[u8]) -> Trailers {
    let text = String::from_utf8_lossy(block);
    let mut trailers = Trailers::default();
    for line in text.split("\r\n").flat_map(|l| l.split('\n')) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "grpc-status" => trailers.status = parse_status(value),
            "grpc-message" => trailers.message = percent_decode(value.trim()),
            _ => {}
        }
    }
    trailers
}

fn trailers_from_headers(headers: &HeaderMap) -> Trailers {
    let status = headers
        .get("grpc-status")
        .and_then(|v| v.to_str().ok())
        .and_then(parse_status);
    let message = headers
        .get("grpc-message")
        .and_then(|v| v.to_str().ok())
        .map(|v| percent_decode(v.trim()))
        .unwrap_or_default();
    Trailers { status, message }
}

fn parse_status(raw: &str) -> Option<StatusCode> {
    raw.trim().parse::<i32>().ok().map(StatusCode::from_number)
}

/// Decodes `%XX` escapes as used by `grpc-message`; malformed escapes are kept verbatim.
fn percent_decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Encodes a deadline as a gRPC `TimeoutValue`: at most eight digits and a unit.
fn grpc_timeout(timeout: Duration) -> String {
    const MAX_DIGITS: u128 = 99_999_999;

    let millis = timeout.as_millis().max(1);
    if millis <= MAX_DIGITS {
        return format!("{millis}m");
    }
    let secs = u128::from(timeout.as_secs());
    if secs <= MAX_DIGITS {
        return format!("{secs}S");
    }
    let minutes = secs / 60;
    if minutes <= MAX_DIGITS {
        return format!("{minutes}M");
    }
    format!("{}H", (minutes / 60).min(MAX_DIGITS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trailer_frame(text: &str) -> Vec<u8> {
        let mut frame = vec![TRAILER_FLAG];
        frame.extend((text.len() as u32).to_be_bytes());
        frame.extend(text.as_bytes());
        frame
    }

    #[test]
    fn frames_are_length_prefixed() {
        assert_eq!(encode_frame(b"abc").as_ref(), &[0, 0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn parses_message_and_trailers() {
        let mut body = encode_frame(b"payload").to_vec();
        body.extend(trailer_frame("grpc-status:0\r\ngrpc-message:\r\n"));
        let reply = parse_reply(&body).unwrap();
        assert_eq!(reply.message.as_deref(), Some(&b"payload"[..]));
        assert_eq!(reply.trailers.unwrap().status, Some(StatusCode::Ok));
    }

    #[test]
    fn decodes_error_trailers() {
        let body = trailer_frame("grpc-status: 5\r\ngrpc-message: session%20s1%20unknown\r\n");
        let trailers = parse_reply(&body).unwrap().trailers.unwrap();
        assert_eq!(trailers.status, Some(StatusCode::NotFound));
        assert_eq!(trailers.message, "session s1 unknown");
    }

    #[test]
    fn rejects_truncated_and_compressed_frames() {
        assert!(matches!(parse_reply(&[0, 0, 0]), Err(TransportError::Protocol(_))));
        assert!(matches!(parse_reply(&[0, 0, 0, 0, 9, 1]), Err(TransportError::Protocol(_))));
        assert!(matches!(parse_reply(&[1, 0, 0, 0, 0]), Err(TransportError::Protocol(_))));
    }

    #[test]
    fn percent_decoding_keeps_malformed_escapes() {
        assert_eq!(percent_decode("a%2Fb"), "a/b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("caf%C3%A9"), "café");
    }

    #[test]
    fn timeouts_fit_in_eight_digits() {
        assert_eq!(grpc_timeout(Duration::from_millis(1500)), "1500m");
        assert_eq!(grpc_timeout(Duration::from_micros(10)), "1m");
        assert_eq!(grpc_timeout(Duration::from_millis(99_999_999)), "99999999m");
        assert_eq!(grpc_timeout(Duration::from_millis(100_000_000)), "100000S");
        assert_eq!(grpc_timeout(Duration::from_secs(100_000_000)), "1666666M");
        assert_eq!(grpc_timeout(Duration::from_secs(u64::MAX)), "99999999H");
    }
}
