//! The storage interface and the backend selector.

use std::future::Future;
use std::path::PathBuf;

use tracing::info;

use super::bucket::OpendalBucket;
use super::config::{StorageConfig, StorageProvider};
use super::error::StorageError;
use super::key::FileKey;
use super::local::LocalFilesystemStorage;
use super::object_store::ObjectStoreStorage;
use super::types::{FileDetail, StoredFileHandle};

/// Backend-agnostic file storage.
///
/// Deleting something that does not exist succeeds. Operations on the same
/// key are not serialized; concurrent writers get the backend's
/// last-write-wins behavior.
pub trait StorageService: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Persist an uploaded file at `key`, consuming the ephemeral handle.
    fn save_file(
        &self,
        handle: StoredFileHandle,
        key: &FileKey,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Public address of a stored file. Performs no I/O.
    fn construct_file_url(&self, key: &FileKey) -> String;

    /// Resolve a document key to the location of its stored file.
    fn get_file_path(
        &self,
        key: &FileKey,
    ) -> impl Future<Output = Result<PathBuf, StorageError>> + Send;

    /// Every file under every document of a namespace.
    fn list_files_in_namespace(
        &self,
        namespace_id: &str,
    ) -> impl Future<Output = Result<Vec<FileDetail>, StorageError>> + Send;

    /// Remove every file under a namespace.
    fn delete_workspace_files(
        &self,
        namespace_id: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove every file under one document.
    fn delete_file_from_workspace(
        &self,
        namespace_id: &str,
        document_id: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove the single file named by `key`, leaving the rest of its
    /// document in place.
    fn delete_file(&self, key: &FileKey) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// The storage backend selected at startup.
///
/// Built once from configuration and shared behind an `Arc`; callers only
/// use it through [`StorageService`].
#[derive(Debug)]
pub enum StorageBackend {
    /// Local directory tree.
    Filesystem(LocalFilesystemStorage),
    /// S3-compatible bucket.
    ObjectStore(ObjectStoreStorage),
}

impl StorageBackend {
    /// Create the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the object store client cannot be initialized.
    pub fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let backend = match config.provider {
            StorageProvider::LocalFs {
                root,
                public_base_url,
            } => Self::Filesystem(
                LocalFilesystemStorage::new(root, public_base_url)
                    .with_strict_path_resolution(config.strict_path_resolution),
            ),
            StorageProvider::ObjectStore {
                endpoint,
                region,
                bucket,
                access_key_id,
                secret_access_key,
                public_base_url,
            } => {
                let client = OpendalBucket::s3(
                    &endpoint,
                    &region,
                    &bucket,
                    &access_key_id,
                    &secret_access_key,
                )?;
                let storage = ObjectStoreStorage::new(client, bucket, &endpoint)
                    .with_delete_retry(config.delete_retry);
                Self::ObjectStore(match public_base_url {
                    Some(url) => storage.with_public_base_url(url),
                    None => storage,
                })
            }
        };

        info!(backend = backend.backend_name(), "Storage backend selected");
        Ok(backend)
    }
}

impl StorageService for StorageBackend {
    fn backend_name(&self) -> &'static str {
        match self {
            Self::Filesystem(s) => s.backend_name(),
            Self::ObjectStore(s) => s.backend_name(),
        }
    }

    async fn save_file(&self, handle: StoredFileHandle, key: &FileKey) -> Result<(), StorageError> {
        match self {
            Self::Filesystem(s) => s.save_file(handle, key).await,
            Self::ObjectStore(s) => s.save_file(handle, key).await,
        }
    }

    fn construct_file_url(&self, key: &FileKey) -> String {
        match self {
            Self::Filesystem(s) => s.construct_file_url(key),
            Self::ObjectStore(s) => s.construct_file_url(key),
        }
    }

    async fn get_file_path(&self, key: &FileKey) -> Result<PathBuf, StorageError> {
        match self {
            Self::Filesystem(s) => s.get_file_path(key).await,
            Self::ObjectStore(s) => s.get_file_path(key).await,
        }
    }

    async fn list_files_in_namespace(
        &self,
        namespace_id: &str,
    ) -> Result<Vec<FileDetail>, StorageError> {
        match self {
            Self::Filesystem(s) => s.list_files_in_namespace(namespace_id).await,
            Self::ObjectStore(s) => s.list_files_in_namespace(namespace_id).await,
        }
    }

    async fn delete_workspace_files(&self, namespace_id: &str) -> Result<(), StorageError> {
        match self {
            Self::Filesystem(s) => s.delete_workspace_files(namespace_id).await,
            Self::ObjectStore(s) => s.delete_workspace_files(namespace_id).await,
        }
    }

    async fn delete_file_from_workspace(
        &self,
        namespace_id: &str,
        document_id: &str,
    ) -> Result<(), StorageError> {
        match self {
            Self::Filesystem(s) => s.delete_file_from_workspace(namespace_id, document_id).await,
            Self::ObjectStore(s) => s.delete_file_from_workspace(namespace_id, document_id).await,
        }
    }

    async fn delete_file(&self, key: &FileKey) -> Result<(), StorageError> {
        match self {
            Self::Filesystem(s) => s.delete_file(key).await,
            Self::ObjectStore(s) => s.delete_file(key).await,
        }
    }
}
