use crate::status_code::StatusCode;
use crate::transport::TransportError;
use thiserror::Error;

/// Failure to establish a [`Client`](crate::Client) from a configuration.
///
/// Fatal to `connect`; never retried internally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Secure transport requires credential material (root certificate or token)")]
    MissingCredentials,

    #[error("Insecure transport is not permitted in a production configuration")]
    InsecureInProduction,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid {key}: {message}")]
    InvalidSetting { key: String, message: String },
}

impl ConnectionError {
    pub(crate) fn invalid_endpoint(endpoint: &str, reason: impl Into<String>) -> Self {
        ConnectionError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure of a single `detect_intent` call.
///
/// Exactly one of these is returned per failed call; there are no partial results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// A required request field is empty or malformed. No remote call was issued.
    #[error("Invalid request: {field}: {message}")]
    InvalidRequest { field: String, message: String },

    /// Unreachable host, TLS failure, or timeout (detail is exactly `"timeout"`).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote service answered with a well-formed error status.
    #[error("Remote error: {code}: {message}")]
    Remote { code: StatusCode, message: String },

    /// The reply could not be decoded into a response.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl CallError {
    pub(crate) fn invalid_request(field: &str, message: impl Into<String>) -> Self {
        CallError::InvalidRequest {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn timeout() -> Self {
        CallError::Transport("timeout".to_string())
    }

    /// The remote status code, if the failure came from the service.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            CallError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Hint for caller retry policies. The client never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            CallError::Transport(_) => true,
            CallError::Remote { code, .. } => code.retryable(),
            CallError::InvalidRequest { .. } | CallError::Decode(_) => false,
        }
    }
}

impl From<TransportError> for CallError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => CallError::timeout(),
            TransportError::Status { code, message } => CallError::Remote { code, message },
            TransportError::Unavailable(detail) | TransportError::Protocol(detail) => {
                CallError::Transport(detail)
            }
        }
    }
}

/// Failure to load a [`ClientConfig`](crate::ClientConfig) from a file or the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Keyring error: {0}")]
    Keyring(String),
}

/// Unified error type for the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_timeout_becomes_timeout_detail() {
        let err: CallError = TransportError::Timeout.into();
        assert_eq!(err, CallError::Transport("timeout".into()));
        assert!(err.is_retryable());
    }

    #[test]
    fn remote_status_is_preserved() {
        let err: CallError = TransportError::Status {
            code: StatusCode::NotFound,
            message: "session s1 unknown".into(),
        }
        .into();
        assert_eq!(err.status_code(), Some(StatusCode::NotFound));
        assert_eq!(err.to_string(), "Remote error: NOT_FOUND: session s1 unknown");
        assert!(!err.is_retryable());
    }

    #[test]
    fn invalid_request_is_not_retryable() {
        let err = CallError::invalid_request("text", "must not be empty");
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Invalid request: text: must not be empty");
    }
}
