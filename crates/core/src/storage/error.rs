//! Storage error types.

use thiserror::Error;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Persisting a file failed.
    #[error("failed to write {key}: {reason}")]
    Write {
        /// Key being written.
        key: String,
        /// Underlying failure.
        reason: String,
    },

    /// File or document not found in storage.
    #[error("file not found: {key}")]
    NotFound {
        /// Storage key that was not found.
        key: String,
    },

    /// Path resolution found more than one candidate.
    #[error("{key} resolves to {candidates} files")]
    AmbiguousResult {
        /// Document key being resolved.
        key: String,
        /// Number of files found.
        candidates: usize,
    },

    /// Operation not meaningful for the active backend.
    #[error("{operation} is not supported by the {backend} backend")]
    Unsupported {
        /// Operation name.
        operation: &'static str,
        /// Backend name.
        backend: &'static str,
    },

    /// Bulk delete exhausted its retries.
    #[error("failed to delete objects after {attempts} attempts: {reason}")]
    DeletionFailed {
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        reason: String,
    },

    /// Invalid storage key format.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Storage provider configuration error.
    #[error("storage configuration error: {0}")]
    Configuration(String),

    /// Backend operation error.
    #[error("storage operation failed: {0}")]
    Operation(String),
}

impl StorageError {
    /// Create a write error.
    #[must_use]
    pub fn write(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Write {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create an ambiguous result error.
    #[must_use]
    pub fn ambiguous(key: impl Into<String>, candidates: usize) -> Self {
        Self::AmbiguousResult {
            key: key.into(),
            candidates,
        }
    }

    /// Create an unsupported operation error.
    #[must_use]
    pub const fn unsupported(operation: &'static str, backend: &'static str) -> Self {
        Self::Unsupported { operation, backend }
    }

    /// Create a deletion failed error.
    #[must_use]
    pub fn deletion_failed(attempts: u32, reason: impl ToString) -> Self {
        Self::DeletionFailed {
            attempts,
            reason: reason.to_string(),
        }
    }

    /// Create an invalid key error.
    #[must_use]
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an operation error.
    #[must_use]
    pub fn operation(msg: impl ToString) -> Self {
        Self::Operation(msg.to_string())
    }
}

impl From<opendal::Error> for StorageError {
    fn from(err: opendal::Error) -> Self {
        match err.kind() {
            opendal::ErrorKind::NotFound => Self::NotFound {
                key: err.to_string(),
            },
            opendal::ErrorKind::Unsupported => Self::Unsupported {
                operation: "request",
                backend: "object_store",
            },
            _ => Self::Operation(err.to_string()),
        }
    }
}

impl From<StorageError> for notes_shared::AppError {
    fn from(err: StorageError) -> Self {
        let msg = err.to_string();
        match err {
            StorageError::NotFound { .. } => Self::NotFound(msg),
            StorageError::AmbiguousResult { .. } => Self::Conflict(msg),
            StorageError::Unsupported { .. } => Self::Unsupported(msg),
            StorageError::InvalidKey(_) => Self::Validation(msg),
            StorageError::Configuration(_) => Self::Internal(msg),
            StorageError::Write { .. }
            | StorageError::DeletionFailed { .. }
            | StorageError::Operation(_) => Self::Storage(msg),
        }
    }
}
