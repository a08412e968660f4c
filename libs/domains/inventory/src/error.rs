use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Malformed record '{name}': {reason}")]
    MalformedRecord { name: String, reason: String },

    #[error("Image upload failed: {0}")]
    UploadFailed(String),

    #[error("Image not found: {0}")]
    ImageNotFound(String),
}

pub type InventoryResult<T> = Result<T, InventoryError>;

impl InventoryError {
    pub(crate) fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        InventoryError::MalformedRecord {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Convert InventoryError to AppError for standardized error responses
impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        match err {
            InventoryError::InvalidQuantity(msg) => {
                AppError::BadRequest(format!("Invalid quantity: {}", msg))
            }
            InventoryError::Validation(msg) => AppError::BadRequest(msg),
            InventoryError::StoreUnavailable(msg) => AppError::ServiceUnavailable(msg),
            err @ InventoryError::MalformedRecord { .. } => {
                AppError::InternalServerError(err.to_string())
            }
            InventoryError::UploadFailed(msg) => AppError::BadGateway(msg),
            InventoryError::ImageNotFound(key) => {
                AppError::NotFound(format!("Image {} not found", key))
            }
        }
    }
}

impl IntoResponse for InventoryError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for InventoryError {
    fn from(err: mongodb::error::Error) -> Self {
        InventoryError::StoreUnavailable(err.to_string())
    }
}
