//! Object store backend.
//!
//! Keys are flat: `<namespace_id>/<document_id>/<file_name>`. Directory
//! structure only exists through `/`-delimited prefix queries.

use std::path::{Path, PathBuf};

use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use tracing::{debug, error, warn};

use super::bucket::{BucketClient, OpendalBucket};
use super::config::RetryPolicy;
use super::error::StorageError;
use super::key::{FileKey, validate_segment};
use super::service::StorageService;
use super::types::{FileDetail, StoredFileHandle};

/// Prefix depth below the namespace at which listing stops descending.
///
/// Well-formed keys only need one level of common prefixes (the document).
/// Deeper prefixes are still listed down to this depth; anything below it
/// is skipped with a warning.
pub const MAX_LIST_DEPTH: usize = 8;

/// Stores files in an S3-compatible bucket.
#[derive(Debug)]
pub struct ObjectStoreStorage<C = OpendalBucket> {
    client: C,
    bucket: String,
    endpoint_host: String,
    public_base_url: Option<String>,
    delete_retry: RetryPolicy,
}

impl<C: BucketClient> ObjectStoreStorage<C> {
    /// Create an object store backend.
    ///
    /// `endpoint` is the region endpoint, e.g.
    /// `https://nyc3.digitaloceanspaces.com`; public URLs are built as
    /// `https://<bucket>.<endpoint host>/<key>`. Objects are written without
    /// an ACL, so those URLs only resolve under a public-read bucket policy.
    #[must_use]
    pub fn new(client: C, bucket: impl Into<String>, endpoint: &str) -> Self {
        let host = endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string();
        Self {
            client,
            bucket: bucket.into(),
            endpoint_host: host,
            public_base_url: None,
            delete_retry: RetryPolicy::default(),
        }
    }

    /// Serve public URLs from a different base (e.g. a CDN).
    #[must_use]
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the bulk delete retry policy.
    #[must_use]
    pub fn with_delete_retry(mut self, policy: RetryPolicy) -> Self {
        self.delete_retry = policy;
        self
    }

    /// Underlying bucket client.
    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    fn url_for_key(&self, key: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("https://{}.{}/{key}", self.bucket, self.endpoint_host),
        }
    }

    /// Build a listing entry from a raw key, skipping keys outside the
    /// `namespace/document/name` layout.
    fn detail_for(&self, key: &str) -> Option<FileDetail> {
        let mut parts = key.splitn(3, '/');
        let (Some(_), Some(document_id), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            warn!(key, "Skipping object outside the document layout");
            return None;
        };
        if document_id.is_empty() || name.is_empty() {
            warn!(key, "Skipping object outside the document layout");
            return None;
        }
        Some(FileDetail {
            document_id: document_id.to_string(),
            name: name.to_string(),
            url: self.url_for_key(key),
        })
    }

    /// List one prefix level, then every common prefix below it concurrently.
    fn list_level(
        &self,
        prefix: String,
        depth: usize,
    ) -> BoxFuture<'_, Result<Vec<FileDetail>, StorageError>> {
        async move {
            let listing = self.client.list(&prefix).await.inspect_err(|e| {
                error!(prefix = %prefix, error = %e, "Failed to list objects");
            })?;

            let mut files: Vec<FileDetail> = listing
                .keys
                .iter()
                .filter_map(|key| self.detail_for(key))
                .collect();

            let children: Vec<String> = listing
                .common_prefixes
                .into_iter()
                .filter(|p| p.len() > prefix.len() && p.starts_with(prefix.as_str()))
                .collect();

            if depth >= MAX_LIST_DEPTH {
                if !children.is_empty() {
                    warn!(prefix = %prefix, skipped = children.len(), "Listing depth limit reached");
                }
                return Ok(files);
            }

            let nested = try_join_all(
                children
                    .into_iter()
                    .map(|child| self.list_level(child, depth + 1)),
            )
            .await?;
            files.extend(nested.into_iter().flatten());
            Ok(files)
        }
        .boxed()
    }

    /// Delete every object under `prefix`, retrying the batched delete.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), StorageError> {
        let keys = self.client.list_keys(prefix).await?;
        if keys.is_empty() {
            debug!(prefix, "Nothing to delete");
            return Ok(());
        }
        self.delete_keys(prefix, &keys).await
    }

    /// Batched delete of `keys` under the retry policy. `prefix` is for logs.
    async fn delete_keys(&self, prefix: &str, keys: &[String]) -> Result<(), StorageError> {
        let max_attempts = self.delete_retry.max_attempts;
        let mut last_error = None;
        for attempt in 1..=max_attempts {
            match self.client.delete_objects(keys).await {
                Ok(()) => {
                    debug!(prefix, count = keys.len(), attempt, "Deleted objects");
                    return Ok(());
                }
                Err(e) => {
                    warn!(prefix, attempt, max_attempts, error = %e, "Failed to delete objects");
                    last_error = Some(e);
                }
            }
        }

        let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
        error!(prefix, max_attempts, "Giving up on deleting objects");
        Err(StorageError::deletion_failed(max_attempts, reason))
    }
}

/// Removes the ephemeral upload when dropped, whatever happened to the upload.
struct EphemeralFile<'a>(&'a Path);

impl Drop for EphemeralFile<'_> {
    // Runs on the executor thread: a single blocking unlink, also reached
    // when the save future is cancelled.
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(self.0)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.0.display(), error = %e, "Failed to delete local file");
        }
    }
}

impl<C: BucketClient> StorageService for ObjectStoreStorage<C> {
    fn backend_name(&self) -> &'static str {
        "object_store"
    }

    async fn save_file(&self, handle: StoredFileHandle, key: &FileKey) -> Result<(), StorageError> {
        let _cleanup = EphemeralFile(&handle.path);

        let name = key
            .relative_name()
            .ok_or_else(|| StorageError::invalid_key(format!("{key} does not name a file")))?;
        if name.contains('/') {
            return Err(StorageError::invalid_key(format!(
                "object keys take a flat file name, got '{name}'"
            )));
        }

        let object_key = key.to_string();
        self.client
            .put_file(&object_key, &handle.path, &handle.mime_type)
            .await
            .inspect_err(|e| error!(key = %object_key, error = %e, "Failed to upload file"))?;

        debug!(key = %object_key, bucket = %self.bucket, "Uploaded file to object store");
        Ok(())
    }

    fn construct_file_url(&self, key: &FileKey) -> String {
        self.url_for_key(&key.to_string())
    }

    async fn get_file_path(&self, _key: &FileKey) -> Result<PathBuf, StorageError> {
        Err(StorageError::unsupported("get_file_path", "object_store"))
    }

    async fn list_files_in_namespace(
        &self,
        namespace_id: &str,
    ) -> Result<Vec<FileDetail>, StorageError> {
        validate_segment("namespace id", namespace_id)?;

        let mut files = self
            .list_level(FileKey::namespace_prefix(namespace_id), 0)
            .await?;
        files.sort();
        files.dedup();

        debug!(namespace_id, count = files.len(), "Listed namespace files");
        Ok(files)
    }

    async fn delete_workspace_files(&self, namespace_id: &str) -> Result<(), StorageError> {
        validate_segment("namespace id", namespace_id)?;
        self.delete_prefix(&FileKey::namespace_prefix(namespace_id))
            .await
    }

    async fn delete_file_from_workspace(
        &self,
        namespace_id: &str,
        document_id: &str,
    ) -> Result<(), StorageError> {
        let key = FileKey::document(namespace_id, document_id)?;
        self.delete_prefix(&key.prefix()).await
    }

    async fn delete_file(&self, key: &FileKey) -> Result<(), StorageError> {
        if key.relative_name().is_none() {
            return Err(StorageError::invalid_key(format!("{key} does not name a file")));
        }
        let object_key = key.to_string();
        self.delete_keys(&object_key, std::slice::from_ref(&object_key))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> ObjectStoreStorage {
        let client = OpendalBucket::memory().expect("memory bucket");
        ObjectStoreStorage::new(client, "notes", "https://nyc3.digitaloceanspaces.com/")
    }

    #[test]
    fn test_construct_file_url() {
        let key = FileKey::new("ns1", "doc1", "report.pdf").expect("valid key");
        assert_eq!(
            storage().construct_file_url(&key),
            "https://notes.nyc3.digitaloceanspaces.com/ns1/doc1/report.pdf"
        );
    }

    #[test]
    fn test_construct_file_url_with_public_base() {
        let key = FileKey::new("ns1", "doc1", "report.pdf").expect("valid key");
        let storage = storage().with_public_base_url("https://cdn.example.com/");
        assert_eq!(
            storage.construct_file_url(&key),
            "https://cdn.example.com/ns1/doc1/report.pdf"
        );
    }

    #[test]
    fn test_detail_for_strips_document_prefix() {
        let detail = storage()
            .detail_for("ns1/doc1/report.pdf")
            .expect("inside layout");
        assert_eq!(detail.document_id, "doc1");
        assert_eq!(detail.name, "report.pdf");

        assert!(storage().detail_for("ns1/stray.txt").is_none());
    }

    #[tokio::test]
    async fn test_get_file_path_is_unsupported() {
        let key = FileKey::document("ns1", "doc1").expect("valid key");
        let err = storage().get_file_path(&key).await.unwrap_err();
        assert!(matches!(err, StorageError::Unsupported { .. }));
    }

    async fn seeded_storage() -> ObjectStoreStorage {
        let storage = storage();
        let fixture = [
            ("doc1", "a.txt"),
            ("doc1", "b.txt"),
            ("doc2", "a.txt"),
            ("doc2", "b.txt"),
        ];
        for (doc, name) in fixture {
            storage
                .client()
                .operator()
                .write(&format!("ns1/{doc}/{name}"), b"x".to_vec())
                .await
                .expect("seed object");
        }
        storage
    }

    fn pairs(files: &[FileDetail]) -> Vec<(&str, &str)> {
        files
            .iter()
            .map(|f| (f.document_id.as_str(), f.name.as_str()))
            .collect()
    }

    #[tokio::test]
    async fn test_memory_bucket_lists_union_of_documents() {
        let storage = seeded_storage().await;

        let files = storage.list_files_in_namespace("ns1").await.expect("list");
        assert_eq!(
            pairs(&files),
            vec![
                ("doc1", "a.txt"),
                ("doc1", "b.txt"),
                ("doc2", "a.txt"),
                ("doc2", "b.txt"),
            ]
        );
        assert_eq!(
            files[0].url,
            "https://notes.nyc3.digitaloceanspaces.com/ns1/doc1/a.txt"
        );
    }

    #[tokio::test]
    async fn test_memory_bucket_document_then_namespace_delete() {
        let storage = seeded_storage().await;

        storage
            .delete_file_from_workspace("ns1", "doc1")
            .await
            .expect("delete document");
        let files = storage.list_files_in_namespace("ns1").await.expect("list");
        assert_eq!(pairs(&files), vec![("doc2", "a.txt"), ("doc2", "b.txt")]);

        storage.delete_workspace_files("ns1").await.expect("delete namespace");
        storage.delete_workspace_files("ns1").await.expect("delete again");
        assert!(storage.list_files_in_namespace("ns1").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_save_rejects_nested_name_and_cleans_up() {
        let staging = tempfile::tempdir().expect("tempdir");
        let path = staging.path().join("upload");
        std::fs::write(&path, b"data").expect("write");

        let key = FileKey::new("ns1", "doc1", "pages/1.txt").expect("valid key");
        let handle = StoredFileHandle::new(&path, "1.txt", "text/plain");
        let err = storage().save_file(handle, &key).await.unwrap_err();

        assert!(matches!(err, StorageError::InvalidKey(_)));
        assert!(!path.exists(), "ephemeral file should be removed on failure");
    }
}
