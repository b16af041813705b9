//! Hub error types with HTTP status code mapping.
//!
//! [`HubError`] is the central error type of the crate. Most variants never
//! reach a client: connection-level failures are handled by tearing down
//! that one connection. The few that surface over HTTP (`/ws`, `/health`)
//! map to a structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::SessionId;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 1001,
///     "message": "missing or invalid user identity"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                 |
/// |-----------|-----------------------|-----------------------------|
/// | 1000–1999 | Request / identity    | 400 / 401                   |
/// | 2000–2999 | Connection transport  | 410 Gone / 503              |
/// | 3000–3999 | Server / dependencies | 500 / 503 / 504             |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The upgrade request carried no usable user identity.
    #[error("missing or invalid user identity")]
    Unauthorized,

    /// A payload handed to the hub could not be interpreted.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The connection's transport is already closed.
    #[error("connection {0} is closed")]
    ConnectionClosed(SessionId),

    /// The connection's outbound queue is full; the peer is not reading.
    #[error("connection {0} is not keeping up with outbound traffic")]
    ConnectionBacklogged(SessionId),

    /// The hub event loop has stopped.
    #[error("hub is not running")]
    HubClosed,

    /// The hub inbound queue is full and the event was not accepted.
    #[error("hub inbound queue is full")]
    HubBusy,

    /// The board access check failed.
    #[error("access check failed: {0}")]
    AccessCheck(String),

    /// The board access check did not answer in time.
    #[error("access check timed out")]
    AccessCheckTimeout,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Configuration value could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Frame serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Unauthorized => 1001,
            Self::InvalidPayload(_) => 1002,
            Self::ConnectionClosed(_) => 2001,
            Self::ConnectionBacklogged(_) => 2002,
            Self::HubClosed => 3001,
            Self::HubBusy => 3002,
            Self::AccessCheck(_) => 3003,
            Self::AccessCheckTimeout => 3004,
            Self::Persistence(_) => 3005,
            Self::InvalidConfig(_) => 3006,
            Self::Serialization(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::ConnectionClosed(_) => StatusCode::GONE,
            Self::ConnectionBacklogged(_) | Self::HubClosed | Self::HubBusy => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::AccessCheckTimeout => StatusCode::GATEWAY_TIMEOUT,
            Self::AccessCheck(_)
            | Self::Persistence(_)
            | Self::InvalidConfig(_)
            | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for HubError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_401() {
        let err = HubError::Unauthorized;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.error_code(), 1001);
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn stopped_hub_maps_to_503() {
        assert_eq!(
            HubError::HubClosed.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(HubError::HubBusy.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn messages_name_the_session() {
        let session = SessionId::new();
        let msg = HubError::ConnectionBacklogged(session).to_string();
        assert!(msg.contains(&session.to_string()));
    }
}
