//! Storage keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Composite address of a stored file: `namespace/document[/relative_name]`.
///
/// A key without a relative name addresses a whole document and is what
/// [`get_file_path`](super::StorageService::get_file_path) expects.
///
/// Serialized as its `/`-joined string; deserializing validates like
/// [`FromStr`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileKey {
    namespace_id: String,
    document_id: String,
    relative_name: Option<String>,
}

impl FileKey {
    /// Create a key naming one file inside a document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if any component is malformed.
    pub fn new(
        namespace_id: impl Into<String>,
        document_id: impl Into<String>,
        relative_name: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let key = Self {
            namespace_id: namespace_id.into(),
            document_id: document_id.into(),
            relative_name: Some(relative_name.into()),
        };
        key.validate()?;
        Ok(key)
    }

    /// Create a key naming a whole document.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKey` if any component is malformed.
    pub fn document(
        namespace_id: impl Into<String>,
        document_id: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let key = Self {
            namespace_id: namespace_id.into(),
            document_id: document_id.into(),
            relative_name: None,
        };
        key.validate()?;
        Ok(key)
    }

    /// Namespace component.
    #[must_use]
    pub fn namespace_id(&self) -> &str {
        &self.namespace_id
    }

    /// Document component.
    #[must_use]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Relative name within the document, if this key names a file.
    #[must_use]
    pub fn relative_name(&self) -> Option<&str> {
        self.relative_name.as_deref()
    }

    /// Key prefix covering every file of the document: `namespace/document/`.
    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}/{}/", self.namespace_id, self.document_id)
    }

    /// Key prefix covering every file of a namespace: `namespace/`.
    #[must_use]
    pub fn namespace_prefix(namespace_id: &str) -> String {
        format!("{namespace_id}/")
    }

    fn validate(&self) -> Result<(), StorageError> {
        validate_segment("namespace id", &self.namespace_id)?;
        validate_segment("document id", &self.document_id)?;
        if let Some(name) = &self.relative_name {
            validate_relative_name(name)?;
        }
        Ok(())
    }
}

/// Validate a single id segment (no separators, no dot segments).
pub(crate) fn validate_segment(what: &str, value: &str) -> Result<(), StorageError> {
    if value.is_empty() {
        return Err(StorageError::invalid_key(format!("{what} is empty")));
    }
    if value.contains('/') || value.contains('\\') {
        return Err(StorageError::invalid_key(format!(
            "{what} '{value}' contains a path separator"
        )));
    }
    if value == "." || value == ".." {
        return Err(StorageError::invalid_key(format!("{what} '{value}' is reserved")));
    }
    Ok(())
}

fn validate_relative_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() {
        return Err(StorageError::invalid_key("relative name is empty"));
    }
    if name.starts_with('/') {
        return Err(StorageError::invalid_key(format!(
            "relative name '{name}' is absolute"
        )));
    }
    if name
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(StorageError::invalid_key(format!(
            "relative name '{name}' has an empty or dot segment"
        )));
    }
    Ok(())
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.relative_name {
            Some(name) => write!(f, "{}/{}/{}", self.namespace_id, self.document_id, name),
            None => write!(f, "{}/{}", self.namespace_id, self.document_id),
        }
    }
}

impl FromStr for FileKey {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '/');
        let namespace_id = parts.next().unwrap_or_default();
        let document_id = parts
            .next()
            .ok_or_else(|| StorageError::invalid_key(format!("'{s}' has no document id")))?;

        match parts.next() {
            Some(name) => Self::new(namespace_id, document_id, name),
            None => Self::document(namespace_id, document_id),
        }
    }
}

impl TryFrom<String> for FileKey {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FileKey> for String {
    fn from(key: FileKey) -> Self {
        key.to_string()
    }
}
