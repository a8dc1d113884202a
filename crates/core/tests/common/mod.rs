//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use notes_core::ingest::{IndexError, VectorIndex};
use notes_core::processing::{Embedder, ProcessedDocument, ProcessingError};
use notes_core::storage::{BucketClient, Listing, StorageError, StoredFileHandle};

/// In-memory bucket with S3 delimiter semantics and injectable delete
/// failures.
#[derive(Default)]
pub struct FakeBucket {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    failing_deletes: AtomicU32,
    delete_calls: AtomicU32,
}

impl FakeBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` batched deletes fail.
    pub fn fail_next_deletes(&self, count: u32) {
        self.failing_deletes.store(count, Ordering::SeqCst);
    }

    pub fn delete_calls(&self) -> u32 {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn insert(&self, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), body.to_vec());
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

impl BucketClient for FakeBucket {
    async fn put_file(
        &self,
        key: &str,
        source: &Path,
        _content_type: &str,
    ) -> Result<(), StorageError> {
        let body = tokio::fs::read(source)
            .await
            .map_err(|e| StorageError::write(key, e))?;
        self.insert(key, &body);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Listing, StorageError> {
        let objects = self.objects.lock().unwrap();
        let mut keys = Vec::new();
        let mut prefixes = BTreeSet::new();
        for key in objects.keys().filter(|k| k.starts_with(prefix)) {
            let rest = &key[prefix.len()..];
            match rest.find('/') {
                Some(i) => {
                    prefixes.insert(format!("{prefix}{}", &rest[..=i]));
                }
                None => keys.push(key.clone()),
            }
        }
        Ok(Listing {
            keys,
            common_prefixes: prefixes.into_iter().collect(),
        })
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let pending = self.failing_deletes.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_deletes.store(pending - 1, Ordering::SeqCst);
            return Err(StorageError::operation("503 Slow Down"));
        }
        let mut objects = self.objects.lock().unwrap();
        for key in keys {
            objects.remove(key);
        }
        Ok(())
    }
}

/// Deterministic embedder: each vector encodes the chunk length.
pub struct FakeEmbedder;

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProcessingError> {
        Ok(texts
            .iter()
            .map(|t| vec![t.chars().count() as f32, 1.0])
            .collect())
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

/// Records upserted documents; can be told to reject them.
#[derive(Default)]
pub struct MemoryIndex {
    documents: Mutex<Vec<(String, ProcessedDocument)>>,
    reject: AtomicBool,
}

impl MemoryIndex {
    pub fn rejecting() -> Self {
        let index = Self::default();
        index.reject.store(true, Ordering::SeqCst);
        index
    }

    pub fn documents(&self) -> Vec<(String, ProcessedDocument)> {
        self.documents.lock().unwrap().clone()
    }
}

impl VectorIndex for MemoryIndex {
    async fn upsert(
        &self,
        namespace_id: &str,
        document: &ProcessedDocument,
    ) -> Result<(), IndexError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(IndexError::new("index unavailable"));
        }
        self.documents
            .lock()
            .unwrap()
            .push((namespace_id.to_string(), document.clone()));
        Ok(())
    }
}

/// Write `body` to a staging file and return a handle to it.
pub fn stage(dir: &Path, name: &str, mime_type: &str, body: &[u8]) -> StoredFileHandle {
    let path = dir.join(format!("staged-{name}"));
    std::fs::write(&path, body).unwrap();
    StoredFileHandle::new(path, name, mime_type)
}
