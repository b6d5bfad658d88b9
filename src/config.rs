//! 连接配置：端点、传输安全模式、凭据，以及 YAML / 环境变量加载。
//!
//! Connection configuration.
//!
//! A [`ClientConfig`] is built once by the caller (in code, from a YAML file, or from
//! `NLU_*` environment variables) and handed to [`Client::connect`](crate::Client::connect),
//! which validates it. Nothing here performs network I/O.

use crate::error::{ConfigError, ConnectionError};
use crate::transport::check_metadata;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Remote procedure invoked by default.
pub const DEFAULT_PROCEDURE: &str = "/ondewo.nlu.Sessions/DetectIntent";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Keyring service name used by [`Credentials::from_keyring`] callers that have no better choice.
pub const KEYRING_SERVICE: &str = "nlu-intent-client";

/// Deployment environment. Plaintext transport is only allowed in `Development`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Which wire transport the default client uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Native gRPC over HTTP/2 (tonic).
    #[default]
    Grpc,
    /// gRPC-Web over HTTP/1.1 (reqwest), for browser-facing gateways.
    GrpcWeb,
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grpc" => Ok(TransportKind::Grpc),
            "grpc-web" | "grpc_web" | "grpcweb" => Ok(TransportKind::GrpcWeb),
            other => Err(format!("unknown transport '{other}'")),
        }
    }
}

/// Credential material for secure channels.
///
/// Either part may be absent; the credentials are empty when both are.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    root_certificate: Option<Vec<u8>>,
    token: Option<String>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credentials holding only a bearer token.
    pub fn token(token: impl Into<String>) -> Self {
        Self::new().with_token(token)
    }

    /// Credentials holding only a PEM-encoded root certificate bundle.
    pub fn root_certificate(pem: impl Into<Vec<u8>>) -> Self {
        Self::new().with_root_certificate(pem)
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.token = (!token.trim().is_empty()).then_some(token);
        self
    }

    pub fn with_root_certificate(mut self, pem: impl Into<Vec<u8>>) -> Self {
        let pem = pem.into();
        self.root_certificate = (!pem.iter().all(u8::is_ascii_whitespace)).then_some(pem);
        self
    }

    /// Reads a PEM root certificate bundle from disk.
    pub fn with_root_certificate_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(self.with_root_certificate(pem))
    }

    /// Looks up a token stored in the OS keyring under `service` / `account`.
    pub fn from_keyring(service: &str, account: &str) -> Result<Self, ConfigError> {
        let entry = keyring::Entry::new(service, account)
            .map_err(|e| ConfigError::Keyring(e.to_string()))?;
        let token = entry
            .get_password()
            .map_err(|e| ConfigError::Keyring(e.to_string()))?;
        Ok(Self::token(token))
    }

    pub fn token_value(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn root_certificate_pem(&self) -> Option<&[u8]> {
        self.root_certificate.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.root_certificate.is_none()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field(
                "root_certificate",
                &self.root_certificate.as_ref().map(|pem| format!("<{} bytes>", pem.len())),
            )
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Connection configuration for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// `host:port` or a URL (`http`, `https`, `grpc`, `grpcs`).
    pub endpoint: String,
    /// Use TLS. Requires non-empty [`Credentials`].
    pub secure: bool,
    pub credentials: Option<Credentials>,
    pub environment: Environment,
    /// Default bound on a single call; see `Client::detect_intent_with_timeout`.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Fully-qualified remote procedure, e.g. `/ondewo.nlu.Sessions/DetectIntent`.
    pub procedure: String,
    pub transport: TransportKind,
    /// Metadata sent with every call, ahead of any per-call metadata.
    pub metadata: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            secure: false,
            credentials: None,
            environment: Environment::Development,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            procedure: DEFAULT_PROCEDURE.to_string(),
            transport: TransportKind::Grpc,
            metadata: Vec::new(),
        }
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_procedure(mut self, procedure: impl Into<String>) -> Self {
        self.procedure = procedure.into();
        self
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Checks the invariants `connect` relies on and returns the parsed endpoint.
    pub fn validate(&self) -> Result<Endpoint, ConnectionError> {
        let endpoint = Endpoint::parse(&self.endpoint)?;

        for (key, value) in [("timeout", self.timeout), ("connect_timeout", self.connect_timeout)] {
            if value.is_zero() {
                return Err(ConnectionError::InvalidSetting {
                    key: key.to_string(),
                    message: "must be greater than zero".into(),
                });
            }
        }

        for (key, value) in &self.metadata {
            check_metadata(key, value).map_err(|message| ConnectionError::InvalidSetting {
                key: "metadata".into(),
                message,
            })?;
        }

        if !self.procedure.starts_with('/') || self.procedure.len() < 2 {
            return Err(ConnectionError::invalid_endpoint(
                &self.endpoint,
                format!("procedure '{}' must start with '/'", self.procedure),
            ));
        }

        if self.secure {
            let has_material = self
                .credentials
                .as_ref()
                .map(|c| !c.is_empty())
                .unwrap_or(false);
            if !has_material {
                return Err(ConnectionError::MissingCredentials);
            }
        } else if self.environment == Environment::Production {
            return Err(ConnectionError::InsecureInProduction);
        }

        Ok(endpoint)
    }

    /// Loads a configuration from a YAML file, then applies `NLU_*` environment overrides.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let base_dir = path.parent().map(Path::to_path_buf);
        Self::from_yaml_str(&raw, base_dir.as_deref())?.apply_env_overrides()
    }

    /// Parses YAML. Relative certificate paths resolve against `base_dir` when given.
    pub fn from_yaml_str(raw: &str, base_dir: Option<&Path>) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(raw)?;
        file.into_config(base_dir)
    }

    /// Builds a configuration purely from `NLU_*` environment variables.
    ///
    /// `NLU_ENDPOINT` is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Applies `NLU_*` environment overrides on top of this configuration.
    pub fn apply_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint = lookup("NLU_ENDPOINT").ok_or_else(|| ConfigError::Missing("NLU_ENDPOINT".into()))?;
        ClientConfig::new(endpoint).apply_overrides(lookup)
    }

    pub(crate) fn apply_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(endpoint) = lookup("NLU_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(raw) = lookup("NLU_SECURE") {
            self.secure = parse_bool("NLU_SECURE", &raw)?;
        }
        if let Some(raw) = lookup("NLU_ENVIRONMENT") {
            self.environment = raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "NLU_ENVIRONMENT".into(),
                message,
            })?;
        }
        if let Some(raw) = lookup("NLU_TRANSPORT") {
            self.transport = raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "NLU_TRANSPORT".into(),
                message,
            })?;
        }
        if let Some(raw) = lookup("NLU_TIMEOUT_MS") {
            self.timeout = Duration::from_millis(parse_millis("NLU_TIMEOUT_MS", &raw)?);
        }
        if let Some(procedure) = lookup("NLU_PROCEDURE") {
            self.procedure = procedure;
        }

        let token = lookup("NLU_TOKEN");
        let cert_path = lookup("NLU_ROOT_CERT_PATH");
        if token.is_some() || cert_path.is_some() {
            let mut credentials = self.credentials.take().unwrap_or_default();
            if let Some(token) = token {
                credentials = credentials.with_token(token);
            }
            if let Some(path) = cert_path {
                credentials = credentials.with_root_certificate_file(path)?;
            }
            self.credentials = Some(credentials);
        }

        Ok(self)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<u64, ConfigError> {
    let ms = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected a number of milliseconds, got '{raw}'"),
    })?;
    positive_millis(key, ms)
}

fn positive_millis(key: &str, ms: u64) -> Result<u64, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(ms)
}

/// On-disk YAML shape.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    endpoint: Option<String>,
    secure: bool,
    environment: Environment,
    timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    procedure: Option<String>,
    transport: TransportKind,
    metadata: BTreeMap<String, String>,
    credentials: Option<CredentialsFile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CredentialsFile {
    token: Option<String>,
    root_certificate_path: Option<PathBuf>,
    root_certificate_pem: Option<String>,
}

impl ConfigFile {
    fn into_config(self, base_dir: Option<&Path>) -> Result<ClientConfig, ConfigError> {
        let endpoint = self
            .endpoint
            .ok_or_else(|| ConfigError::Missing("endpoint".into()))?;

        let mut config = ClientConfig::new(endpoint)
            .with_secure(self.secure)
            .with_environment(self.environment)
            .with_transport(self.transport);
        config.metadata = self.metadata.into_iter().collect();

        if let Some(ms) = self.timeout_ms {
            config.timeout = Duration::from_millis(positive_millis("timeout_ms", ms)?);
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(positive_millis("connect_timeout_ms", ms)?);
        }
        if let Some(procedure) = self.procedure {
            config.procedure = procedure;
        }

        if let Some(file) = self.credentials {
            let mut credentials = Credentials::new();
            if let Some(token) = file.token {
                credentials = credentials.with_token(token);
            }
            if let Some(pem) = file.root_certificate_pem {
                credentials = credentials.with_root_certificate(pem.into_bytes());
            }
            if let Some(path) = file.root_certificate_path {
                let path = match base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path,
                };
                credentials = credentials.with_root_certificate_file(path)?;
            }
            config.credentials = Some(credentials);
        }

        Ok(config)
    }
}

/// A validated endpoint address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    path_prefix: String,
}

impl Endpoint {
    /// Parses `host:port` or a URL with scheme `http`, `https`, `grpc` or `grpcs`.
    pub fn parse(raw: &str) -> Result<Self, ConnectionError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConnectionError::invalid_endpoint(raw, "endpoint is empty"));
        }
        if trimmed.contains("://") {
            Self::parse_url(raw, trimmed)
        } else {
            Self::parse_host_port(raw, trimmed)
        }
    }

    fn parse_url(raw: &str, trimmed: &str) -> Result<Self, ConnectionError> {
        let url = url::Url::parse(trimmed)
            .map_err(|e| ConnectionError::invalid_endpoint(raw, e.to_string()))?;

        let default_port = match url.scheme() {
            "http" => Some(80),
            "https" | "grpcs" => Some(443),
            "grpc" => None,
            other => {
                return Err(ConnectionError::invalid_endpoint(
                    raw,
                    format!("unsupported scheme '{other}'"),
                ))
            }
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ConnectionError::invalid_endpoint(raw, "missing host"))?;
        let port = url
            .port()
            .or(default_port)
            .ok_or_else(|| ConnectionError::invalid_endpoint(raw, "missing port"))?;
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConnectionError::invalid_endpoint(
                raw,
                "query and fragment are not allowed",
            ));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            path_prefix: url.path().trim_end_matches('/').to_string(),
        })
    }

    fn parse_host_port(raw: &str, trimmed: &str) -> Result<Self, ConnectionError> {
        let (host, port) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| ConnectionError::invalid_endpoint(raw, "expected host:port"))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ConnectionError::invalid_endpoint(raw, format!("invalid port '{port}'")))?;
        if host.is_empty() {
            return Err(ConnectionError::invalid_endpoint(raw, "missing host"));
        }
        url::Host::parse(host)
            .map_err(|e| ConnectionError::invalid_endpoint(raw, format!("invalid host: {e}")))?;

        Ok(Self {
            host: host.to_string(),
            port,
            path_prefix: String::new(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Host name without IPv6 brackets, as used for TLS server name checks.
    pub fn server_name(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    /// Path prefix from a URL endpoint (e.g. `/nlu`), without a trailing slash.
    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    /// `scheme://host:port`. The `secure` flag decides the scheme.
    pub fn origin(&self, secure: bool) -> String {
        let scheme = if secure { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// Origin followed by the path prefix.
    pub fn base_uri(&self, secure: bool) -> String {
        format!("{}{}", self.origin(secure), self.path_prefix)
    }
}
