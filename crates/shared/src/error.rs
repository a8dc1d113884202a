//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Request is ambiguous (e.g. more than one candidate file).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation not supported by the active backend.
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// Persisting or removing stored files failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Document processing failed.
    #[error("Processing error: {0}")]
    Processing(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::Unsupported(_) => 501,
            Self::Processing(_) => 422,
            Self::ExternalService(_) => 502,
            Self::Storage(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::Unsupported(_) => "NOT_SUPPORTED",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Processing(_) => "PROCESSING_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
