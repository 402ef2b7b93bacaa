use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// ApiError
///
/// The full failure taxonomy of the API. Every handler returns
/// `Result<_, ApiError>`; the conversion to an HTTP status and envelope
/// happens in one place, in `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or empty required fields, malformed identifiers. 400.
    #[error("{0}")]
    Validation(String),
    /// No credentials presented. 401.
    #[error("{0}")]
    Unauthorized(String),
    /// Credentials presented but rejected (bad signature, expired). 403.
    #[error("{0}")]
    Forbidden(String),
    /// The referenced user, post, or comment does not exist. 404.
    #[error("{0}")]
    NotFound(String),
    /// Storage or otherwise unclassified failure. Surfaced as a generic 500;
    /// the underlying cause goes to the log, never to the client.
    #[error("internal error: {0}")]
    Unexpected(String),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Unexpected(err.to_string())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure envelope: `{"success": false, "message": "..."}`.
#[derive(Serialize)]
struct Failure {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Unexpected(cause) => {
                // The cause is operational detail; the client gets a fixed message.
                tracing::error!(error = %cause, "request failed with server error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(Failure {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

/// Success envelope: `{"success": true, ...payload}`. The payload is
/// serde-flattened so response fields sit next to the flag, matching the
/// public API contract.
#[derive(Serialize)]
pub struct Success<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Success<T> {
    pub fn of(body: T) -> Json<Success<T>> {
        Json(Success {
            success: true,
            body,
        })
    }
}
