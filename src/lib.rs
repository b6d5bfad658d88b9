//! # nlu-intent-client
//!
//! 意图识别客户端：通过 gRPC / gRPC-Web 调用远程 NLU 服务的 `DetectIntent` 接口。
//!
//! Typed client for remote intent-detection services.
//!
//! ## Overview
//!
//! A caller builds a [`ClientConfig`] (endpoint, security mode, credentials),
//! [`Client::connect`]s once, and then issues [`Client::detect_intent`] calls.
//! Every call either fully succeeds with a decoded [`DetectIntentResponse`] or
//! fails with exactly one [`CallError`]. Nothing is retried automatically.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nlu_intent_client::{Client, ClientConfig, Credentials, DetectIntentRequest};
//!
//! #[tokio::main]
//! async fn main() -> nlu_intent_client::Result<()> {
//!     let config = ClientConfig::new("nlu.example.com:443")
//!         .with_secure(true)
//!         .with_credentials(Credentials::token("my-token"));
//!     let client = Client::connect(config)?;
//!
//!     let request = DetectIntentRequest::new("my-project", "session-1", "Hi", "en");
//!     let response = client.detect_intent(&request).await?;
//!     println!("{} ({:.2})", response.intent_name, response.confidence);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Connection configuration, YAML and env loading |
//! | [`client`] | The client and its builder |
//! | [`types`] | Request and response value types |
//! | [`transport`] | `RpcTransport` seam with gRPC and gRPC-Web implementations |
//! | [`status_code`] | Canonical remote status codes |
//! | [`proto`] | Protobuf wire messages |

pub mod client;
pub mod config;
pub mod error;
pub mod proto;
pub mod status_code;
pub mod transport;
pub mod types;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, Credentials, Environment, TransportKind};
pub use error::{CallError, ConfigError, ConnectionError, Error};
pub use status_code::StatusCode;
pub use transport::{CallOptions, RpcTransport, TransportError};
pub use types::{DetectIntentRequest, DetectIntentResponse};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;
