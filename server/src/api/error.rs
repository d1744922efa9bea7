//! Error type bridging domain errors and HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reserva_core::ReservationError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Wraps domain errors and implements Axum's `IntoResponse` so handlers can
/// simply return `Result<Json<T>, ApiError>`. The body carries the stable
/// domain error code so clients can branch without parsing messages.
#[derive(Debug)]
pub struct ApiError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl ApiError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            message.into(),
            "UNAUTHORIZED".to_string(),
        )
    }

    /// Attach a source error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        let status = match &err {
            // Stale view of shared state: conflict, refresh and retry by hand.
            ReservationError::InsufficientStock { .. }
            | ReservationError::InvalidTransition { .. } => StatusCode::CONFLICT,
            ReservationError::ProductNotFound(_) | ReservationError::ReservationNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            ReservationError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
            ReservationError::Forbidden => StatusCode::FORBIDDEN,
            ReservationError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let api = Self::new(status, err.to_string(), err.code().to_string());
        if matches!(err, ReservationError::Storage(_)) {
            // Keep the cause for the 500 log line; the body stays generic.
            api.with_source(anyhow::Error::new(err))
        } else {
            api
        }
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}
