//! Ingestion error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Failure reported by a [`VectorIndex`](super::VectorIndex).
#[derive(Debug, Error)]
#[error("index error: {0}")]
pub struct IndexError(pub String);

impl IndexError {
    /// Create an index error from any message.
    #[must_use]
    pub fn new(msg: impl ToString) -> Self {
        Self(msg.to_string())
    }
}

/// Ingestion errors.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The uploaded file could not be read.
    #[error("failed to read upload {path}: {reason}")]
    Read {
        /// Path of the ephemeral upload.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// Storing or addressing the file failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The worker reported an error.
    #[error("processing failed: {message}")]
    Processing {
        /// Worker error message.
        message: String,
        /// Whether the saved file was removed again.
        compensated: bool,
    },

    /// The processed document could not be indexed.
    #[error("indexing failed: {source}")]
    Index {
        /// Index failure.
        source: IndexError,
        /// Whether the saved file was removed again.
        compensated: bool,
    },
}

impl IngestError {
    /// Whether stored files were cleaned up after the failure.
    #[must_use]
    pub const fn compensated(&self) -> bool {
        match self {
            Self::Processing { compensated, .. } | Self::Index { compensated, .. } => *compensated,
            Self::Read { .. } | Self::Storage(_) => false,
        }
    }
}

impl From<IngestError> for notes_shared::AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Storage(e) => e.into(),
            IngestError::Read { .. } => Self::Validation(err.to_string()),
            IngestError::Processing { .. } => Self::Processing(err.to_string()),
            IngestError::Index { .. } => Self::ExternalService(err.to_string()),
        }
    }
}
