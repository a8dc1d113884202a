//! Values passed across the storage interface.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A stored file as reported by listing operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    /// Document the file belongs to.
    pub document_id: String,
    /// Path of the file relative to its document.
    pub name: String,
    /// Publicly resolvable address of the file.
    pub url: String,
}

/// Ephemeral local file produced by upload validation.
///
/// Consumed by [`save_file`](super::StorageService::save_file); the file at
/// `path` may be moved or deleted by the backend afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFileHandle {
    /// Location of the temporary file.
    pub path: PathBuf,
    /// Filename as supplied by the uploader.
    pub original_name: String,
    /// MIME type reported for the upload.
    pub mime_type: String,
}

impl StoredFileHandle {
    /// Create a handle for a temporary file.
    #[must_use]
    pub fn new(
        path: impl Into<PathBuf>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
        }
    }
}
