//! End-to-end ingestion over the filesystem backend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeEmbedder, MemoryIndex, stage};
use notes_core::ingest::{IngestError, Ingestor};
use notes_core::processing::{DocumentPipeline, DocumentWorker};
use notes_core::storage::{LocalFilesystemStorage, StorageService};
use notes_shared::ProcessingSettings;
use tempfile::TempDir;

const BASE_URL: &str = "http://localhost:4001/api/documents/files";

fn ingestor(
    root: &TempDir,
    index: MemoryIndex,
) -> (
    Ingestor<LocalFilesystemStorage, MemoryIndex>,
    Arc<LocalFilesystemStorage>,
    Arc<MemoryIndex>,
) {
    let storage = Arc::new(LocalFilesystemStorage::new(root.path().join("uploads"), BASE_URL));
    let index = Arc::new(index);
    let pipeline = DocumentPipeline::from_settings(&ProcessingSettings::default(), Arc::new(FakeEmbedder));
    let worker = DocumentWorker::new(Arc::new(pipeline)).with_timeout(Some(Duration::from_secs(30)));
    (
        Ingestor::new(Arc::clone(&storage), worker, Arc::clone(&index)),
        storage,
        index,
    )
}

#[tokio::test]
async fn test_ingest_stores_and_indexes() {
    let root = TempDir::new().unwrap();
    let (ingestor, storage, index) = ingestor(&root, MemoryIndex::default());
    let handle = stage(root.path(), "notes.txt", "text/plain", b"Alpha. Beta. Gamma.");

    let report = ingestor.ingest("ns1", "doc1", handle).await.unwrap();

    assert_eq!(report.key, "ns1/doc1/notes.txt");
    assert_eq!(report.url, format!("{BASE_URL}/ns1/doc1/notes.txt"));
    assert_eq!(report.chunk_count, 1);

    let files = storage.list_files_in_namespace("ns1").await.unwrap();
    assert_eq!(files.len(), 1);

    let documents = index.documents();
    assert_eq!(documents.len(), 1);
    let (namespace, document) = &documents[0];
    assert_eq!(namespace, "ns1");
    assert_eq!(document.document_url, report.url);
    assert_eq!(document.chunks[0].text, "Alpha. Beta. Gamma.");
    assert!(!document.chunks[0].embedding.is_empty());
}

#[tokio::test]
async fn test_ingest_sanitizes_file_name() {
    let root = TempDir::new().unwrap();
    let (ingestor, _, _) = ingestor(&root, MemoryIndex::default());
    let handle = stage(root.path(), "upload.md", "text/markdown", b"# Title\n\nBody text.");
    let handle = notes_core::storage::StoredFileHandle {
        original_name: "my notes (draft).md".into(),
        ..handle
    };

    let report = ingestor.ingest("ns1", "doc1", handle).await.unwrap();
    assert_eq!(report.key, "ns1/doc1/my_notes__draft_.md");
}

#[tokio::test]
async fn test_processing_failure_removes_stored_files() {
    let root = TempDir::new().unwrap();
    let (ingestor, storage, index) = ingestor(&root, MemoryIndex::default());
    let handle = stage(root.path(), "broken.pdf", "application/pdf", b"definitely not a pdf");

    let err = ingestor.ingest("ns1", "doc1", handle).await.unwrap_err();

    assert!(matches!(err, IngestError::Processing { compensated: true, .. }));
    assert!(storage.list_files_in_namespace("ns1").await.unwrap().is_empty());
    assert!(index.documents().is_empty());
}

#[tokio::test]
async fn test_failed_reupload_keeps_indexed_file() {
    let root = TempDir::new().unwrap();
    let (ingestor, storage, index) = ingestor(&root, MemoryIndex::default());
    let good = stage(root.path(), "good.txt", "text/plain", b"Alpha. Beta.");
    ingestor.ingest("ns1", "doc1", good).await.unwrap();

    let bad = stage(root.path(), "bad.pdf", "application/pdf", b"definitely not a pdf");
    let err = ingestor.ingest("ns1", "doc1", bad).await.unwrap_err();

    assert!(matches!(err, IngestError::Processing { compensated: true, .. }));
    let files = storage.list_files_in_namespace("ns1").await.unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["good.txt"]);
    assert_eq!(index.documents().len(), 1);
}

#[tokio::test]
async fn test_index_failure_removes_stored_files() {
    let root = TempDir::new().unwrap();
    let (ingestor, storage, _) = ingestor(&root, MemoryIndex::rejecting());
    let handle = stage(root.path(), "notes.txt", "text/plain", b"Alpha. Beta.");

    let err = ingestor.ingest("ns1", "doc1", handle).await.unwrap_err();

    assert!(matches!(err, IngestError::Index { compensated: true, .. }));
    assert!(storage.list_files_in_namespace("ns1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_upload_is_read_error() {
    let root = TempDir::new().unwrap();
    let (ingestor, storage, _) = ingestor(&root, MemoryIndex::default());
    let handle = notes_core::storage::StoredFileHandle::new(
        root.path().join("gone.txt"),
        "gone.txt",
        "text/plain",
    );

    let err = ingestor.ingest("ns1", "doc1", handle).await.unwrap_err();

    assert!(matches!(err, IngestError::Read { .. }));
    assert!(storage.list_files_in_namespace("ns1").await.unwrap().is_empty());
}
