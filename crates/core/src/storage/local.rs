//! Local filesystem backend.
//!
//! Layout on disk is `<root>/<namespace_id>/<document_id>/<relative_name>`.
//! Existing deployments depend on this layout; do not change it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use super::error::StorageError;
use super::key::{FileKey, validate_segment};
use super::service::StorageService;
use super::types::{FileDetail, StoredFileHandle};

/// Stores files in a directory tree under an upload root.
#[derive(Debug, Clone)]
pub struct LocalFilesystemStorage {
    root: PathBuf,
    public_base_url: String,
    strict_path_resolution: bool,
}

impl LocalFilesystemStorage {
    /// Create a filesystem backend rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            strict_path_resolution: false,
        }
    }

    /// Fail path resolution when a document holds more than one file.
    #[must_use]
    pub fn with_strict_path_resolution(mut self, strict: bool) -> Self {
        self.strict_path_resolution = strict;
        self
    }

    /// Upload root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn namespace_dir(&self, namespace_id: &str) -> PathBuf {
        self.root.join(namespace_id)
    }

    fn document_dir(&self, namespace_id: &str, document_id: &str) -> PathBuf {
        self.namespace_dir(namespace_id).join(document_id)
    }

    fn url_for(&self, namespace_id: &str, document_id: &str, name: &str) -> String {
        format!(
            "{}/{namespace_id}/{document_id}/{name}",
            self.public_base_url
        )
    }

    /// Files below a document directory, as `/`-separated relative names.
    async fn document_files(dir: &Path) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        let mut pending = vec![(dir.to_path_buf(), String::new())];

        while let Some((current, rel)) = pending.pop() {
            let mut entries = fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let Ok(name) = entry.file_name().into_string() else {
                    warn!(path = %entry.path().display(), "Skipping non UTF-8 file name");
                    continue;
                };
                if is_staging_name(&name) {
                    continue;
                }
                let rel_name = if rel.is_empty() {
                    name
                } else {
                    format!("{rel}/{name}")
                };
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), rel_name));
                } else if file_type.is_file() {
                    names.push(rel_name);
                }
            }
        }

        names.sort();
        Ok(names)
    }

    async fn remove_tree(path: &Path) -> Result<(), StorageError> {
        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::operation(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }
}

/// Suffix of the hidden sibling a cross-device copy is written to.
const STAGING_SUFFIX: &str = ".part";

fn staging_path(dest: &Path) -> PathBuf {
    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{file_name}{STAGING_SUFFIX}"))
}

fn is_staging_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(STAGING_SUFFIX)
}

/// Move `src` to `dest`, copying when the rename would cross filesystems.
async fn move_into_place(src: &Path, dest: &Path) -> std::io::Result<()> {
    match fs::rename(src, dest).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            copy_into_place(src, dest).await?;
            fs::remove_file(src).await
        }
        Err(e) => Err(e),
    }
}

/// Copy `src` to a hidden sibling of `dest`, then rename it over `dest`.
///
/// `dest` never shows a partial file, and the staging copy is removed again
/// if either step fails.
async fn copy_into_place(src: &Path, dest: &Path) -> std::io::Result<()> {
    let staging = staging_path(dest);
    let result = match fs::copy(src, &staging).await {
        Ok(_) => fs::rename(&staging, dest).await,
        Err(e) => Err(e),
    };
    if result.is_err()
        && let Err(e) = fs::remove_file(&staging).await
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %staging.display(), error = %e, "Failed to remove staging copy");
    }
    result
}

impl StorageService for LocalFilesystemStorage {
    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    async fn save_file(&self, handle: StoredFileHandle, key: &FileKey) -> Result<(), StorageError> {
        let name = key
            .relative_name()
            .ok_or_else(|| StorageError::invalid_key(format!("{key} does not name a file")))?;

        let dest = self
            .document_dir(key.namespace_id(), key.document_id())
            .join(name);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::write(key.to_string(), e))?;
        }

        move_into_place(&handle.path, &dest)
            .await
            .map_err(|e| StorageError::write(key.to_string(), e))?;

        debug!(key = %key, path = %dest.display(), "Saved file to local storage");
        Ok(())
    }

    fn construct_file_url(&self, key: &FileKey) -> String {
        format!("{}/{key}", self.public_base_url)
    }

    async fn get_file_path(&self, key: &FileKey) -> Result<PathBuf, StorageError> {
        let dir = self.document_dir(key.namespace_id(), key.document_id());

        let path = if let Some(name) = key.relative_name() {
            dir.join(name)
        } else {
            let files = match Self::document_files(&dir).await {
                Ok(files) => files,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(StorageError::not_found(key.to_string()));
                }
                Err(e) => return Err(StorageError::operation(e)),
            };
            if self.strict_path_resolution && files.len() > 1 {
                return Err(StorageError::ambiguous(key.to_string(), files.len()));
            }
            let first = files
                .into_iter()
                .next()
                .ok_or_else(|| StorageError::not_found(key.to_string()))?;
            dir.join(first)
        };

        match fs::canonicalize(&path).await {
            Ok(resolved) => Ok(resolved),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(key.to_string())),
            Err(e) => Err(StorageError::operation(e)),
        }
    }

    async fn list_files_in_namespace(
        &self,
        namespace_id: &str,
    ) -> Result<Vec<FileDetail>, StorageError> {
        validate_segment("namespace id", namespace_id)?;
        let namespace_dir = self.namespace_dir(namespace_id);

        let mut entries = match fs::read_dir(&namespace_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::operation(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StorageError::operation)? {
            let is_dir = entry
                .file_type()
                .await
                .map_err(StorageError::operation)?
                .is_dir();
            if !is_dir {
                continue;
            }
            let Ok(document_id) = entry.file_name().into_string() else {
                warn!(path = %entry.path().display(), "Skipping non UTF-8 document directory");
                continue;
            };

            let names = Self::document_files(&entry.path())
                .await
                .map_err(StorageError::operation)?;
            files.extend(names.into_iter().map(|name| FileDetail {
                url: self.url_for(namespace_id, &document_id, &name),
                document_id: document_id.clone(),
                name,
            }));
        }
        files.sort();

        debug!(namespace_id, count = files.len(), "Listed namespace files");
        Ok(files)
    }

    async fn delete_workspace_files(&self, namespace_id: &str) -> Result<(), StorageError> {
        validate_segment("namespace id", namespace_id)?;
        Self::remove_tree(&self.namespace_dir(namespace_id)).await?;
        debug!(namespace_id, "Deleted namespace directory");
        Ok(())
    }

    async fn delete_file_from_workspace(
        &self,
        namespace_id: &str,
        document_id: &str,
    ) -> Result<(), StorageError> {
        validate_segment("namespace id", namespace_id)?;
        validate_segment("document id", document_id)?;
        Self::remove_tree(&self.document_dir(namespace_id, document_id)).await?;
        debug!(namespace_id, document_id, "Deleted document directory");
        Ok(())
    }

    async fn delete_file(&self, key: &FileKey) -> Result<(), StorageError> {
        let name = key
            .relative_name()
            .ok_or_else(|| StorageError::invalid_key(format!("{key} does not name a file")))?;
        let path = self
            .document_dir(key.namespace_id(), key.document_id())
            .join(name);

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StorageError::operation(format!(
                    "failed to remove {}: {e}",
                    path.display()
                )));
            }
        }
        debug!(key = %key, "Deleted file");
        Ok(())
    }
}
