//! Request-time error taxonomy.
//!
//! Every failure that can happen while a request travels through the pipeline is a
//! [`DispatchError`]. Each variant knows its stable `kind` string and the status code
//! the composer renders it with. Startup-time failures live in
//! [`crate::registry::RegistryError`] instead and never reach a client.

use std::time::Duration;

use thiserror::Error;

use crate::http::{Method, StatusCode};

/// A failure surfaced to the response composer.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("malformed request: {reason}")]
    MalformedRequest { reason: String },

    #[error("no resource matches {path}")]
    NoMatch { path: String },

    #[error("method {method} is not allowed on {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        /// Methods that the matching resource does accept, sorted and de-duplicated.
        allowed: Vec<Method>,
    },

    #[error("authentication failed: {reason}")]
    Unauthorized { reason: String },

    #[error("{message}")]
    Client { status: StatusCode, message: String },

    /// The detail is logged, never rendered.
    #[error("handler failed: {detail}")]
    Server { detail: String },

    #[error("handler did not finish within {}ms", .limit.as_millis())]
    Timeout { limit: Duration },
}

impl DispatchError {
    /// Stable machine-readable name used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest { .. } => "MalformedRequestError",
            Self::NoMatch { .. } => "NoMatchError",
            Self::MethodNotAllowed { .. } => "MethodNotAllowedError",
            Self::Unauthorized { .. } => "UnauthorizedError",
            Self::Client { .. } => "ClientError",
            Self::Server { .. } => "ServerError",
            Self::Timeout { .. } => "TimeoutError",
        }
    }

    /// Status code this error is rendered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest { .. } => StatusCode::BadRequest,
            Self::NoMatch { .. } => StatusCode::NotFound,
            Self::MethodNotAllowed { .. } => StatusCode::MethodNotAllowed,
            Self::Unauthorized { .. } => StatusCode::Unauthorized,
            Self::Client { status, .. } => *status,
            Self::Server { .. } => StatusCode::InternalServerError,
            Self::Timeout { .. } => StatusCode::GatewayTimeout,
        }
    }

    /// Message that is safe to show a client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Server { .. } => "internal server error".to_owned(),
            other => other.to_string(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }
}
