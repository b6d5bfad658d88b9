//! 远程状态码：gRPC 规范定义的 17 个标准状态码及其重试语义。
//!
//! Canonical remote status codes.
//!
//! Every remote failure surfaced by this crate carries one of the canonical gRPC
//! status codes, whichever transport produced it. gRPC-Web gateways that answer
//! with a bare HTTP error are mapped through [`StatusCode::from_http_status`].
//!
//! ## Example
//!
//! ```rust
//! use nlu_intent_client::status_code::StatusCode;
//!
//! let code = StatusCode::from_name("NOT_FOUND");
//! assert_eq!(code.number(), 5);
//! assert!(!code.retryable());
//! assert_eq!(code.to_string(), "NOT_FOUND");
//! ```

use std::fmt;

/// Canonical gRPC status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 0: Not an error
    Ok,
    /// 1: The operation was cancelled, typically by the caller
    Cancelled,
    /// 2: Unknown error
    Unknown,
    /// 3: Client specified an invalid argument
    InvalidArgument,
    /// 4: Deadline expired before the operation could complete
    DeadlineExceeded,
    /// 5: Requested entity (project, session, agent) was not found
    NotFound,
    /// 6: Entity the client attempted to create already exists
    AlreadyExists,
    /// 7: Caller lacks permission for the operation
    PermissionDenied,
    /// 8: Some resource (quota, rate) has been exhausted
    ResourceExhausted,
    /// 9: System is not in a state required for the operation
    FailedPrecondition,
    /// 10: Operation was aborted, typically due to a concurrency issue
    Aborted,
    /// 11: Operation was attempted past the valid range
    OutOfRange,
    /// 12: Operation is not implemented or not supported
    Unimplemented,
    /// 13: Internal server error
    Internal,
    /// 14: Service is currently unavailable
    Unavailable,
    /// 15: Unrecoverable data loss or corruption
    DataLoss,
    /// 16: Request lacks valid authentication credentials
    Unauthenticated,
}

impl StatusCode {
    /// Returns the wire number of the code (e.g. `5` for `NOT_FOUND`).
    #[inline]
    pub fn number(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Cancelled => 1,
            Self::Unknown => 2,
            Self::InvalidArgument => 3,
            Self::DeadlineExceeded => 4,
            Self::NotFound => 5,
            Self::AlreadyExists => 6,
            Self::PermissionDenied => 7,
            Self::ResourceExhausted => 8,
            Self::FailedPrecondition => 9,
            Self::Aborted => 10,
            Self::OutOfRange => 11,
            Self::Unimplemented => 12,
            Self::Internal => 13,
            Self::Unavailable => 14,
            Self::DataLoss => 15,
            Self::Unauthenticated => 16,
        }
    }

    /// Returns the canonical name (e.g. `"NOT_FOUND"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "UNKNOWN",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::FailedPrecondition => "FAILED_PRECONDITION",
            Self::Aborted => "ABORTED",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::Unimplemented => "UNIMPLEMENTED",
            Self::Internal => "INTERNAL",
            Self::Unavailable => "UNAVAILABLE",
            Self::DataLoss => "DATA_LOSS",
            Self::Unauthenticated => "UNAUTHENTICATED",
        }
    }

    /// Whether a caller-side retry has a reasonable chance of succeeding.
    ///
    /// The client itself never retries; this is a hint for caller policies.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable | Self::DeadlineExceeded | Self::ResourceExhausted | Self::Aborted
        )
    }

    /// Maps a wire number to a code. Numbers outside the canonical range map to `Unknown`.
    pub fn from_number(number: i32) -> Self {
        match number {
            0 => Self::Ok,
            1 => Self::Cancelled,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// Maps a canonical name (case-insensitive) to a code. Unrecognised names map to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "OK" => Self::Ok,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            "INVALID_ARGUMENT" => Self::InvalidArgument,
            "DEADLINE_EXCEEDED" => Self::DeadlineExceeded,
            "NOT_FOUND" => Self::NotFound,
            "ALREADY_EXISTS" => Self::AlreadyExists,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "RESOURCE_EXHAUSTED" => Self::ResourceExhausted,
            "FAILED_PRECONDITION" => Self::FailedPrecondition,
            "ABORTED" => Self::Aborted,
            "OUT_OF_RANGE" => Self::OutOfRange,
            "UNIMPLEMENTED" => Self::Unimplemented,
            "INTERNAL" => Self::Internal,
            "UNAVAILABLE" => Self::Unavailable,
            "DATA_LOSS" => Self::DataLoss,
            "UNAUTHENTICATED" => Self::Unauthenticated,
            _ => Self::Unknown,
        }
    }

    /// Maps an HTTP status returned by a gRPC-Web gateway without gRPC trailers.
    ///
    /// Follows the gRPC HTTP-to-status mapping; anything unlisted is `Unknown`.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            200 => Self::Ok,
            400 => Self::Internal,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            404 => Self::Unimplemented,
            429 | 502 | 503 | 504 => Self::Unavailable,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<tonic::Code> for StatusCode {
    fn from(code: tonic::Code) -> Self {
        Self::from_number(code as i32)
    }
}
