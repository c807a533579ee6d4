//! Error types for the agwire server.

use agwire_core::NegotiationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Errors that can occur when building a router.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No endpoints were configured.
    #[error("No endpoints configured. Call .with_stream() or .with_legacy_stream() before .build()")]
    NoEndpoints,
}

/// Errors that can occur while serving a request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No registered payload format satisfies the client's `Accept` header.
    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The event source could not start the run.
    #[error("Event source error: {0}")]
    Source(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status this error is answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Source(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<NegotiationError> for ServerError {
    fn from(err: NegotiationError) -> Self {
        match err {
            NegotiationError::InvalidAcceptHeader(_) | NegotiationError::NoAcceptableType => {
                ServerError::NotAcceptable(err.to_string())
            }
            NegotiationError::NoSupportedTypes
            | NegotiationError::UnsupportedType(_)
            | NegotiationError::InvalidFormat(_) => ServerError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ServerError::NotAcceptable(e)
            | ServerError::InvalidRequest(e)
            | ServerError::Source(e)
            | ServerError::Internal(e) => e,
        };

        let body = Json(serde_json::json!({
            "error": message,
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
