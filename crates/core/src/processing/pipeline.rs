//! Extract → chunk → embed.

use std::sync::Arc;

use notes_shared::ProcessingSettings;
use tracing::debug;

use super::chunk::{Chunker, SentenceChunker};
use super::embed::Embedder;
use super::error::ProcessingError;
use super::extract::{FormatExtractor, TextExtractor};
use super::types::{DocumentChunk, ProcessedDocument, ProcessingRequest};

/// The processing stages with their collaborators.
pub struct DocumentPipeline {
    extractor: Arc<dyn TextExtractor>,
    chunker: Arc<dyn Chunker>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
}

impl DocumentPipeline {
    /// Default number of chunks per embedding request.
    pub const DEFAULT_BATCH_SIZE: usize = 64;

    /// Assemble a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        chunker: Arc<dyn Chunker>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            extractor,
            chunker,
            embedder,
            batch_size: Self::DEFAULT_BATCH_SIZE,
        }
    }

    /// Built-in extractors and chunker configured from settings.
    #[must_use]
    pub fn from_settings(settings: &ProcessingSettings, embedder: Arc<dyn Embedder>) -> Self {
        Self::new(
            Arc::new(FormatExtractor::default()),
            Arc::new(SentenceChunker::new(
                settings.chunk_max_chars,
                settings.chunk_overlap_sentences,
            )),
            embedder,
        )
        .with_batch_size(settings.embedding_batch_size)
    }

    /// Set how many chunks go into one embedding request.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run every stage for one file.
    ///
    /// Extraction and chunking run on the blocking pool; embedding awaits
    /// the provider.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure.
    pub async fn run(
        &self,
        request: ProcessingRequest,
    ) -> Result<ProcessedDocument, ProcessingError> {
        let ProcessingRequest {
            file_data,
            file_type,
            file_name,
            document_id,
            document_url,
        } = request;

        let extractor = Arc::clone(&self.extractor);
        let chunker = Arc::clone(&self.chunker);
        let name = file_name.clone();
        let texts = tokio::task::spawn_blocking(move || {
            let text = extractor.extract(&file_type, &name, &file_data)?;
            chunker.chunk(&text)
        })
        .await
        .map_err(|e| ProcessingError::Task(e.to_string()))??;
        debug!(document_id = %document_id, chunks = texts.len(), "Chunked document");

        let mut chunks = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = self.embedder.embed(batch).await?;
            if vectors.len() != batch.len() {
                return Err(ProcessingError::EmbeddingMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }
            if vectors.iter().any(Vec::is_empty) {
                return Err(ProcessingError::embedding("provider returned an empty vector"));
            }
            for (text, embedding) in batch.iter().zip(vectors) {
                chunks.push(DocumentChunk {
                    index: chunks.len(),
                    text: text.clone(),
                    embedding,
                });
            }
        }
        debug!(
            document_id = %document_id,
            model = self.embedder.model_name(),
            "Embedded document"
        );

        Ok(ProcessedDocument {
            document_id,
            document_url,
            file_name,
            chunks,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    struct CountingEmbedder {
        calls: AtomicUsize,
        drop_last: bool,
    }

    #[async_trait]
    impl Embedder for CountingEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProcessingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| vec![t.len() as f32]).collect();
            if self.drop_last {
                vectors.pop();
            }
            Ok(vectors)
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn pipeline(embedder: Arc<CountingEmbedder>, max_chars: usize) -> DocumentPipeline {
        DocumentPipeline::new(
            Arc::new(FormatExtractor::default()),
            Arc::new(SentenceChunker::new(max_chars, 0)),
            embedder,
        )
    }

    fn request(text: &str) -> ProcessingRequest {
        ProcessingRequest {
            file_data: text.as_bytes().to_vec(),
            file_type: "text/plain".into(),
            file_name: "notes.txt".into(),
            document_id: "d1".into(),
            document_url: "http://files/ns/d1/notes.txt".into(),
        }
    }

    #[tokio::test]
    async fn test_batches_embedding_requests() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            drop_last: false,
        });
        let document = pipeline(Arc::clone(&embedder), 6)
            .with_batch_size(2)
            .run(request("Alpha. Beta. Gamma."))
            .await
            .expect("processed");

        assert_eq!(document.chunks.len(), 3);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 2);
        let indices: Vec<usize> = document.chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(document.chunks[1].text, "Beta.");
        assert_eq!(document.document_url, "http://files/ns/d1/notes.txt");
    }

    #[tokio::test]
    async fn test_short_embedding_response_is_mismatch() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            drop_last: true,
        });
        let err = pipeline(embedder, 100)
            .run(request("Alpha. Beta."))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProcessingError::EmbeddingMismatch {
                expected: 1,
                actual: 0
            }
        ));
    }

    #[tokio::test]
    async fn test_unsupported_format_stops_before_embedding() {
        let embedder = Arc::new(CountingEmbedder {
            calls: AtomicUsize::new(0),
            drop_last: false,
        });
        let mut req = request("irrelevant");
        req.file_type = "image/png".into();
        req.file_name = "scan.png".into();

        let err = pipeline(Arc::clone(&embedder), 100).run(req).await.unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedFormat { .. }));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }
}
