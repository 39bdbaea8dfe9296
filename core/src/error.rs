//! Error types for the Nessus API client.
//!
//! # Design
//! The request engine only ever produces `Validation`, `Networking`,
//! `UnexpectedNetworking`, `StatusCode` and `Unexpected`. It does not look at
//! status codes beyond "200 or not": every non-200 response lands in
//! `StatusCode` with the raw code and body, and each endpoint facade decides
//! which domain variant (`NotFound`, `InsufficientPermissions`,
//! `InternalServer`, `Authentication`) that code means for its resource.

use thiserror::Error;

use crate::http::HttpMethod;

pub type Result<T, E = NessusError> = std::result::Result<T, E>;

/// Errors returned by the client, the authentication handshake and the
/// endpoint facades.
#[derive(Debug, Error)]
pub enum NessusError {
    /// A value (usually the base URL) failed validation. Fatal; fix the
    /// configuration.
    #[error("cannot validate {value:?} as {expected}")]
    Validation { value: String, expected: &'static str },

    /// Connection refused, host unreachable or timed out. The request engine
    /// retries these before surfacing them.
    #[error("network request failed: {method} {uri}: {reason}")]
    Networking {
        method: HttpMethod,
        uri: String,
        reason: String,
    },

    /// Any other transport failure. Never retried.
    #[error("unexpected failure during {method} {uri}: {reason}")]
    UnexpectedNetworking {
        method: HttpMethod,
        uri: String,
        reason: String,
    },

    /// The server answered with something other than 200.
    #[error("{method} {uri} returned HTTP {status_code}: {body}")]
    StatusCode {
        method: HttpMethod,
        uri: String,
        status_code: u16,
        body: String,
    },

    /// Credentials were missing or rejected, or there is no session.
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("internal server error: {0}")]
    InternalServer(String),

    /// The response could not be read or decoded into the expected shape.
    #[error("unexpected error: {0}")]
    Unexpected(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl NessusError {
    /// True when a failed request may succeed if issued again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NessusError::Networking { .. })
    }

    /// The HTTP status carried by a `StatusCode` error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            NessusError::StatusCode { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// The response body carried by a `StatusCode` error.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            NessusError::StatusCode { body, .. } => Some(body),
            _ => None,
        }
    }
}
