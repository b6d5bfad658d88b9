use crate::client::core::Client;
use crate::config::{ClientConfig, Credentials, Environment, TransportKind};
use crate::error::ConnectionError;
use crate::transport::RpcTransport;
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating clients with custom configuration.
///
/// Keep this surface area small: everything maps onto a [`ClientConfig`] field,
/// plus an optional transport override for stubs and custom wires.
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn RpcTransport>>,
}

impl ClientBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::from_config(ClientConfig::new(endpoint))
    }

    /// Start from an existing configuration (e.g. loaded from YAML).
    pub fn from_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
        }
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.config.secure = secure;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = Some(credentials);
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.config.environment = environment;
        self
    }

    /// Default bound on each call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn procedure(mut self, procedure: impl Into<String>) -> Self {
        self.config.procedure = procedure.into();
        self
    }

    pub fn transport_kind(mut self, kind: TransportKind) -> Self {
        self.config.transport = kind;
        self
    }

    /// Metadata sent with every call.
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.metadata.push((key.into(), value.into()));
        self
    }

    /// Use this transport instead of the one `transport_kind` selects.
    pub fn transport(mut self, transport: Arc<dyn RpcTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate the configuration and build the client. Performs no network I/O.
    pub fn connect(self) -> Result<Client, ConnectionError> {
        match self.transport {
            Some(transport) => Client::with_transport(self.config, transport),
            None => Client::connect(self.config),
        }
    }
}
