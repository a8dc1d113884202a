//! Bucket client seam for the object-store backend.

use std::future::Future;
use std::path::Path;

use bytes::BytesMut;
use opendal::{Operator, Writer, services};
use tokio::io::AsyncReadExt;
use tracing::warn;

use super::error::StorageError;

/// Read size when streaming a local file into the bucket.
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Multipart part size for uploads.
const UPLOAD_PART_SIZE: usize = 8 * 1024 * 1024;

/// One level of a delimited listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Object keys directly under the prefix.
    pub keys: Vec<String>,
    /// Emulated subdirectories one level down, each ending in `/`.
    pub common_prefixes: Vec<String>,
}

/// Minimal S3-style bucket operations used by the object-store backend.
///
/// Listing methods must return every page; callers never see continuation
/// tokens.
pub trait BucketClient: Send + Sync {
    /// Stream a local file to `key` without buffering it whole.
    fn put_file(
        &self,
        key: &str,
        source: &Path,
        content_type: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// List with `/` as delimiter.
    fn list(&self, prefix: &str) -> impl Future<Output = Result<Listing, StorageError>> + Send;

    /// Every object key under `prefix`, at any depth.
    fn list_keys(&self, prefix: &str)
    -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;

    /// Batched delete of the given keys.
    fn delete_objects(
        &self,
        keys: &[String],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// [`BucketClient`] backed by an OpenDAL operator.
#[derive(Debug, Clone)]
pub struct OpendalBucket {
    operator: Operator,
}

impl OpendalBucket {
    /// Wrap an existing operator.
    #[must_use]
    pub fn new(operator: Operator) -> Self {
        Self { operator }
    }

    /// S3-compatible bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be built.
    pub fn s3(
        endpoint: &str,
        region: &str,
        bucket: &str,
        access_key_id: &str,
        secret_access_key: &str,
    ) -> Result<Self, StorageError> {
        let builder = services::S3::default()
            .endpoint(endpoint)
            .region(region)
            .bucket(bucket)
            .access_key_id(access_key_id)
            .secret_access_key(secret_access_key);

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();
        Ok(Self::new(operator))
    }

    /// Underlying operator.
    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// In-process bucket, for tests and dry runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the operator cannot be built.
    pub fn memory() -> Result<Self, StorageError> {
        let operator = Operator::new(services::Memory::default())
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .finish();
        Ok(Self::new(operator))
    }

    async fn stream_into(file: &mut tokio::fs::File, writer: &mut Writer) -> Result<(), String> {
        let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
        loop {
            buf.reserve(READ_BUFFER_SIZE);
            let read = file.read_buf(&mut buf).await.map_err(|e| e.to_string())?;
            if read == 0 {
                return Ok(());
            }
            writer
                .write(buf.split().freeze())
                .await
                .map_err(|e| e.to_string())?;
        }
    }
}

impl BucketClient for OpendalBucket {
    async fn put_file(&self, key: &str, source: &Path, content_type: &str) -> Result<(), StorageError> {
        let mut file = tokio::fs::File::open(source)
            .await
            .map_err(|e| StorageError::write(key, e))?;

        let mut writer = self
            .operator
            .writer_with(key)
            .content_type(content_type)
            .content_disposition("inline")
            .chunk(UPLOAD_PART_SIZE)
            .await
            .map_err(|e| StorageError::write(key, e))?;

        if let Err(reason) = Self::stream_into(&mut file, &mut writer).await {
            if let Err(abort_err) = writer.abort().await {
                warn!(key, error = %abort_err, "Failed to abort partial upload");
            }
            return Err(StorageError::write(key, reason));
        }

        writer
            .close()
            .await
            .map(|_| ())
            .map_err(|e| StorageError::write(key, e))
    }

    async fn list(&self, prefix: &str) -> Result<Listing, StorageError> {
        let entries = self.operator.list_with(prefix).recursive(false).await?;

        let mut listing = Listing::default();
        for entry in entries {
            let path = entry.path();
            if path == prefix {
                continue;
            }
            if path.ends_with('/') {
                listing.common_prefixes.push(path.to_string());
            } else {
                listing.keys.push(path.to_string());
            }
        }
        Ok(listing)
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let entries = self.operator.list_with(prefix).recursive(true).await?;
        Ok(entries
            .into_iter()
            .map(|entry| entry.path().to_string())
            .filter(|path| !path.ends_with('/'))
            .collect())
    }

    async fn delete_objects(&self, keys: &[String]) -> Result<(), StorageError> {
        self.operator
            .delete_iter(keys.iter().cloned())
            .await
            .map_err(|e| StorageError::operation(e.to_string()))
    }
}
