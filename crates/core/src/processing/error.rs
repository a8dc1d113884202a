//! Document processing error types.

use thiserror::Error;

/// Failures inside the processing pipeline.
///
/// These never cross the worker boundary as errors; the worker reports them
/// as [`WorkerResponse::Error`](super::WorkerResponse::Error) messages.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// No extractor handles this file type.
    #[error("unsupported file type '{file_type}' for {file_name}")]
    UnsupportedFormat {
        /// MIME type reported for the file.
        file_type: String,
        /// Original file name.
        file_name: String,
    },

    /// The payload could not be parsed.
    #[error("failed to extract text: {0}")]
    Extraction(String),

    /// Extraction produced no text.
    #[error("document contains no extractable text")]
    EmptyDocument,

    /// Splitting text into chunks failed.
    #[error("failed to chunk text: {0}")]
    Chunking(String),

    /// The embedding provider failed.
    #[error("embedding request failed: {0}")]
    Embedding(String),

    /// The embedding provider returned the wrong number of vectors.
    #[error("expected {expected} embeddings, got {actual}")]
    EmbeddingMismatch {
        /// Inputs sent.
        expected: usize,
        /// Vectors returned.
        actual: usize,
    },

    /// A pipeline stage died before reporting.
    #[error("processing task failed: {0}")]
    Task(String),
}

impl ProcessingError {
    /// Create an extraction error.
    #[must_use]
    pub fn extraction(msg: impl ToString) -> Self {
        Self::Extraction(msg.to_string())
    }

    /// Create an embedding error.
    #[must_use]
    pub fn embedding(msg: impl ToString) -> Self {
        Self::Embedding(msg.to_string())
    }
}

impl From<ProcessingError> for notes_shared::AppError {
    fn from(err: ProcessingError) -> Self {
        let msg = err.to_string();
        match err {
            ProcessingError::UnsupportedFormat { .. } => Self::Validation(msg),
            ProcessingError::Embedding(_) | ProcessingError::EmbeddingMismatch { .. } => {
                Self::ExternalService(msg)
            }
            ProcessingError::Task(_) => Self::Internal(msg),
            ProcessingError::Extraction(_)
            | ProcessingError::EmptyDocument
            | ProcessingError::Chunking(_) => Self::Processing(msg),
        }
    }
}
