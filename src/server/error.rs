//! HTTP error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::Error;

/// Body returned for an unsupported outbound protocol
pub const UNSUPPORTED_PROTOCOL_MESSAGE: &str = "protocol should be HTTP or XMPP only.";

/// An error rendered as `{ "error": ... }` with a status code
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: Some(message.into()),
        }
    }

    /// Status only, empty body
    pub fn bare(status: StatusCode) -> Self {
        ApiError {
            status,
            message: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Map a library error. Caller input that fails to decode gets
    /// `decode_status`, which differs between routes.
    pub fn from_error(err: Error, decode_status: StatusCode) -> Self {
        match err {
            Error::Decode { .. } | Error::Json(_) => ApiError::new(decode_status, err.to_string()),
            Error::NotFound(_) => ApiError::new(StatusCode::NOT_FOUND, err.to_string()),
            Error::UnsupportedProtocol(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, UNSUPPORTED_PROTOCOL_MESSAGE)
            }
            Error::Transport(_) | Error::Http(_) | Error::Timeout(_) => {
                error!("Push transport failed: {}", err);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to deliver message")
            }
            other => {
                error!("Request failed: {}", other);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.message {
            Some(message) => (self.status, Json(json!({ "error": message }))).into_response(),
            None => self.status.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_status_depends_on_route() {
        let clients = ApiError::from_error(Error::decode("token"), StatusCode::NOT_ACCEPTABLE);
        let message =
            ApiError::from_error(Error::decode("message"), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(clients.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(message.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_internals_do_not_leak() {
        let err = ApiError::from_error(
            Error::Internal("pool exhausted at 10.0.0.3".into()),
            StatusCode::NOT_ACCEPTABLE,
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message.as_deref(), Some("internal server error"));
    }

    #[test]
    fn test_protocol_and_not_found_mapping() {
        let err = ApiError::from_error(
            Error::UnsupportedProtocol("ftp".into()),
            StatusCode::UNPROCESSABLE_ENTITY,
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message.as_deref(), Some(UNSUPPORTED_PROTOCOL_MESSAGE));

        let err = ApiError::from_error(Error::NotFound("T1".into()), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
