//! Ingestion types.

use std::future::Future;

use serde::Serialize;

use super::error::IndexError;
use crate::processing::ProcessedDocument;

/// Destination for processed documents.
///
/// Implemented by whatever vector search collaborator the caller uses.
pub trait VectorIndex: Send + Sync {
    /// Insert or replace a document's chunks in a namespace.
    fn upsert(
        &self,
        namespace_id: &str,
        document: &ProcessedDocument,
    ) -> impl Future<Output = Result<(), IndexError>> + Send;
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Storage key the file was saved under.
    pub key: String,
    /// Public URL of the stored file.
    pub url: String,
    /// Number of indexed chunks.
    pub chunk_count: usize,
}
