//! Worker request and response messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Input handed to a document worker. Owned outright by the worker.
#[derive(Clone)]
pub struct ProcessingRequest {
    /// Raw file bytes.
    pub file_data: Vec<u8>,
    /// MIME type of the file.
    pub file_type: String,
    /// Original file name.
    pub file_name: String,
    /// Document the file belongs to.
    pub document_id: String,
    /// Public address of the stored file, carried into chunk metadata.
    pub document_url: String,
}

impl fmt::Debug for ProcessingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingRequest")
            .field("file_data", &format_args!("{} bytes", self.file_data.len()))
            .field("file_type", &self.file_type)
            .field("file_name", &self.file_name)
            .field("document_id", &self.document_id)
            .field("document_url", &self.document_url)
            .finish()
    }
}

/// A text segment with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Position of the chunk within the document.
    pub index: usize,
    /// Chunk text.
    pub text: String,
    /// Embedding vector for `text`.
    pub embedding: Vec<f32>,
}

/// Processed document ready for indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDocument {
    /// Document id.
    pub document_id: String,
    /// Public address of the stored file.
    pub document_url: String,
    /// Original file name.
    pub file_name: String,
    /// Chunks in document order.
    pub chunks: Vec<DocumentChunk>,
}

/// The single message a worker sends back.
///
/// Serialized as `{"document": {...}}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerResponse {
    /// Processing succeeded.
    Document(ProcessedDocument),
    /// Processing failed; the message describes why.
    Error(String),
}

impl WorkerResponse {
    /// Whether this is an error report.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Convert into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the error message if the worker failed.
    pub fn into_result(self) -> Result<ProcessedDocument, String> {
        match self {
            Self::Document(document) => Ok(document),
            Self::Error(message) => Err(message),
        }
    }
}
