pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Standard error response structure.
///
/// Every error response carries:
/// - `code`: Integer error code for logging/monitoring (e.g., 1011)
/// - `error`: Machine-readable error identifier (e.g., "SERVICE_UNAVAILABLE")
/// - `message`: Human-readable error message
/// - `details`: Optional additional error details (e.g., validation errors)
///
/// # JSON Example
///
/// ```json
/// {
///   "code": 1011,
///   "error": "SERVICE_UNAVAILABLE",
///   "message": "Record store unavailable: connection refused"
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Integer error code for logging and monitoring
    pub code: i32,
    /// Machine-readable error identifier for programmatic handling
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Optional structured error details (e.g., validation field errors)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application error type that can be converted to HTTP responses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppError {
    #[error("JSON parsing error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON extraction error: {0}")]
    JsonExtractorRejection(#[from] JsonRejection),

    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationErrors),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Internal Server Error: {0}")]
    InternalServerError(String),

    #[error("Service Unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Bad Gateway: {0}")]
    BadGateway(String),
}

impl AppError {
    /// Status, client message, details and code for this error, logging it
    /// at a level matching its severity.
    fn parts(self) -> (StatusCode, String, Option<serde_json::Value>, ErrorCode) {
        match self {
            AppError::SerdeJson(e) => {
                let code = ErrorCode::SerdeJsonError;
                tracing::error!(error_code = code.code(), "JSON parsing error: {:?}", e);
                internal(code)
            }
            AppError::Io(e) => {
                let code = ErrorCode::IoError;
                tracing::error!(error_code = code.code(), "I/O error: {:?}", e);
                internal(code)
            }
            AppError::JsonExtractorRejection(e) => {
                let code = ErrorCode::JsonExtraction;
                tracing::warn!(error_code = code.code(), "JSON extraction error: {:?}", e);
                (e.status(), e.body_text(), None, code)
            }
            AppError::ValidationError(e) => {
                let code = ErrorCode::ValidationError;
                tracing::info!(error_code = code.code(), "Validation error: {:?}", e);
                let details = serde_json::to_value(&e).ok();
                (
                    StatusCode::BAD_REQUEST,
                    code.default_message().to_string(),
                    details,
                    code,
                )
            }
            AppError::BadRequest(msg) => {
                tracing::info!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, msg, None, ErrorCode::BadRequest)
            }
            AppError::NotFound(msg) => {
                tracing::info!(error_code = ErrorCode::NotFound.code(), "Not found: {}", msg);
                (StatusCode::NOT_FOUND, msg, None, ErrorCode::NotFound)
            }
            AppError::InternalServerError(msg) => {
                let code = ErrorCode::InternalError;
                tracing::error!(error_code = code.code(), "Internal server error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg, None, code)
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    msg,
                    None,
                    ErrorCode::ServiceUnavailable,
                )
            }
            AppError::BadGateway(msg) => {
                tracing::warn!("Bad gateway: {}", msg);
                (StatusCode::BAD_GATEWAY, msg, None, ErrorCode::BadGateway)
            }
        }
    }
}

fn internal(code: ErrorCode) -> (StatusCode, String, Option<serde_json::Value>, ErrorCode) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        code.default_message().to_string(),
        None,
        code,
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details, code) = self.parts();

        let body = Json(ErrorResponse {
            code: code.code(),
            error: code.as_str().to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

/// Helper function to create error responses.
///
/// # Example
///
/// ```rust,ignore
/// use axum_helpers::errors::{error_response, ErrorCode};
/// use axum::http::StatusCode;
///
/// let response = error_response(
///     StatusCode::BAD_REQUEST,
///     "Invalid input".to_string(),
///     ErrorCode::BadRequest,
/// );
/// ```
pub fn error_response(status: StatusCode, message: String, error_code: ErrorCode) -> Response {
    let body = Json(ErrorResponse {
        code: error_code.code(),
        error: error_code.as_str().to_string(),
        message,
        details: None,
    });

    (status, body).into_response()
}
