//! Ingestion coordinator.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::error::IngestError;
use super::types::{IngestReport, VectorIndex};
use crate::processing::{DocumentWorker, ProcessingRequest, WorkerResponse};
use crate::storage::{FileKey, StorageService, StoredFileHandle};

/// Sanitize an uploaded filename for use as a storage key segment.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Stores an upload, processes it and hands the result to an index.
///
/// The saved file is removed again when processing or indexing fails. Other
/// files of the same document, such as an earlier upload that is already
/// indexed, are left alone.
pub struct Ingestor<S: StorageService, I: VectorIndex> {
    storage: Arc<S>,
    worker: DocumentWorker,
    index: Arc<I>,
}

impl<S: StorageService, I: VectorIndex> Ingestor<S, I> {
    /// Create a new ingestor.
    #[must_use]
    pub fn new(storage: Arc<S>, worker: DocumentWorker, index: Arc<I>) -> Self {
        Self {
            storage,
            worker,
            index,
        }
    }

    /// Ingest one uploaded file as `document_id` in `namespace_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The upload cannot be read or the ids are malformed
    /// - Storage rejects the file
    /// - The worker reports an error
    /// - The index rejects the document
    #[instrument(skip(self, handle), fields(file = %handle.original_name))]
    pub async fn ingest(
        &self,
        namespace_id: &str,
        document_id: &str,
        handle: StoredFileHandle,
    ) -> Result<IngestReport, IngestError> {
        let key = FileKey::new(
            namespace_id,
            document_id,
            sanitize_filename(&handle.original_name),
        )?;

        // Saving consumes the upload, so read it first.
        let file_data = tokio::fs::read(&handle.path)
            .await
            .map_err(|e| IngestError::Read {
                path: handle.path.display().to_string(),
                reason: e.to_string(),
            })?;

        let file_type = handle.mime_type.clone();
        let file_name = handle.original_name.clone();
        self.storage.save_file(handle, &key).await?;
        let url = self.storage.construct_file_url(&key);

        let request = ProcessingRequest {
            file_data,
            file_type,
            file_name,
            document_id: document_id.to_string(),
            document_url: url.clone(),
        };
        let document = match self.worker.process(request).await {
            WorkerResponse::Document(document) => document,
            WorkerResponse::Error(message) => {
                let compensated = self.compensate(&key).await;
                return Err(IngestError::Processing {
                    message,
                    compensated,
                });
            }
        };

        if let Err(source) = self.index.upsert(namespace_id, &document).await {
            let compensated = self.compensate(&key).await;
            return Err(IngestError::Index {
                source,
                compensated,
            });
        }

        info!(key = %key, chunks = document.chunks.len(), "Document ingested");
        Ok(IngestReport {
            key: key.to_string(),
            url,
            chunk_count: document.chunks.len(),
        })
    }

    async fn compensate(&self, key: &FileKey) -> bool {
        warn!(key = %key, "Removing stored file after failed ingestion");
        match self.storage.delete_file(key).await {
            Ok(()) => true,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to remove stored file");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("my report (1).pdf"), "my_report__1_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\docs\\notes.md"), "notes.md");
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename(""), "upload");
    }
}
