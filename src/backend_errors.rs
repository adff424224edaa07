//! # Backend Error Types Module
//!
//! Error taxonomy for calls to the commerce backend. Transport failures are
//! reported as [`BackendError::Network`]; everything the server answered with
//! but we could not accept (a non-2xx status, a body we could not decode, a
//! request reqwest refused to build) belongs to the server-error class.

use thiserror::Error;

/// Errors raised by [`crate::backend::CommerceBackend`] operations
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection failures, timeouts and interrupted bodies
    #[error("network error: {detail}")]
    Network {
        detail: String,
        #[source]
        source: Option<reqwest::Error>,
    },
    /// The backend answered with a non-2xx status
    #[error("server error: {status} - {reason}")]
    Server { status: u16, reason: &'static str },
    /// The backend answered 2xx but the body did not match the expected shape
    #[error("malformed response: {detail}")]
    Malformed {
        detail: String,
        #[source]
        source: serde_json::Error,
    },
    /// Any other request failure
    #[error("request error: {detail}")]
    Request {
        detail: String,
        #[source]
        source: Option<reqwest::Error>,
    },
}

impl BackendError {
    /// Build a server error for a status code, picking the reason from the fixed table
    pub fn from_status(status: u16) -> Self {
        BackendError::Server {
            status,
            reason: reason_for_status(status),
        }
    }

    /// Classify a reqwest failure
    pub fn from_transport(detail: impl Into<String>, err: reqwest::Error) -> Self {
        let detail = detail.into();
        if err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() {
            BackendError::Network {
                detail,
                source: Some(err),
            }
        } else if let Some(status) = err.status() {
            BackendError::from_status(status.as_u16())
        } else {
            BackendError::Request {
                detail,
                source: Some(err),
            }
        }
    }

    /// HTTP status carried by the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, BackendError::Network { .. })
    }

    /// True for every variant of the server-error class
    pub fn is_server(&self) -> bool {
        !self.is_network()
    }
}

/// Human-readable reason for a non-2xx status
pub fn reason_for_status(status: u16) -> &'static str {
    match status {
        400 => "bad request",
        401 => "authentication required",
        403 => "forbidden",
        404 => "not found",
        _ => "unknown error",
    }
}
