//! Storage configuration types.

use std::path::PathBuf;

use notes_shared::StorageSettings;
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Storage provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageProvider {
    /// S3-compatible object store: DigitalOcean Spaces, Cloudflare R2, AWS S3
    ObjectStore {
        /// Endpoint URL.
        endpoint: String,
        /// Region name.
        region: String,
        /// Bucket name.
        bucket: String,
        /// Access key ID.
        access_key_id: String,
        /// Secret access key.
        secret_access_key: String,
        /// Override for public file URLs.
        public_base_url: Option<String>,
    },
    /// Local filesystem
    LocalFs {
        /// Upload root directory.
        root: PathBuf,
        /// Base address for file URLs.
        public_base_url: String,
    },
}

impl StorageProvider {
    /// Create S3-compatible provider.
    #[must_use]
    pub fn object_store(
        endpoint: impl Into<String>,
        region: impl Into<String>,
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self::ObjectStore {
            endpoint: endpoint.into(),
            region: region.into(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            public_base_url: None,
        }
    }

    /// Create local filesystem provider.
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self::LocalFs {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Get the provider name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ObjectStore { .. } => "object_store",
            Self::LocalFs { .. } => "filesystem",
        }
    }
}

/// Bounded retry for bulk deletes. No backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// Default attempt bound.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Create a policy; at least one attempt is always made.
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// Storage service configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage provider configuration.
    pub provider: StorageProvider,
    /// Retry policy for bulk deletes.
    pub delete_retry: RetryPolicy,
    /// Fail path resolution instead of picking the first of several files.
    pub strict_path_resolution: bool,
}

impl StorageConfig {
    /// Create a new storage config with default settings.
    #[must_use]
    pub fn new(provider: StorageProvider) -> Self {
        Self {
            provider,
            delete_retry: RetryPolicy::default(),
            strict_path_resolution: false,
        }
    }

    /// Set the bulk delete retry policy.
    #[must_use]
    pub fn with_delete_retry(mut self, policy: RetryPolicy) -> Self {
        self.delete_retry = policy;
        self
    }

    /// Enable or disable strict path resolution.
    #[must_use]
    pub fn with_strict_path_resolution(mut self, strict: bool) -> Self {
        self.strict_path_resolution = strict;
        self
    }

    /// Select the provider from application settings.
    ///
    /// Object-store credentials win; otherwise files go to the local upload
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are present but no bucket is named.
    pub fn from_settings(settings: &StorageSettings) -> Result<Self, StorageError> {
        let provider = if settings.has_object_store_credentials() {
            let store = &settings.object_store;
            let bucket = store
                .bucket
                .clone()
                .filter(|b| !b.trim().is_empty())
                .ok_or_else(|| {
                    StorageError::configuration("object store credentials set without a bucket")
                })?;
            StorageProvider::ObjectStore {
                endpoint: store.endpoint.clone(),
                region: store.region.clone(),
                bucket,
                access_key_id: store.access_key_id.clone().unwrap_or_default(),
                secret_access_key: store.secret_access_key.clone().unwrap_or_default(),
                public_base_url: store.public_base_url.clone(),
            }
        } else {
            StorageProvider::local_fs(&settings.upload_dir, &settings.public_base_url)
        };

        Ok(Self::new(provider)
            .with_delete_retry(RetryPolicy::new(settings.delete_max_attempts))
            .with_strict_path_resolution(settings.strict_path_resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_filesystem_without_credentials() {
        let settings = StorageSettings::default();
        let config = StorageConfig::from_settings(&settings).expect("valid settings");
        assert_eq!(config.provider.name(), "filesystem");
        assert_eq!(config.delete_retry.max_attempts, 3);
    }

    #[test]
    fn test_selects_object_store_with_credentials() {
        let mut settings = StorageSettings::default();
        settings.object_store.bucket = Some("notes".into());
        settings.object_store.access_key_id = Some("key".into());
        settings.object_store.secret_access_key = Some("secret".into());

        let config = StorageConfig::from_settings(&settings).expect("valid settings");
        match config.provider {
            StorageProvider::ObjectStore { bucket, region, .. } => {
                assert_eq!(bucket, "notes");
                assert_eq!(region, "nyc3");
            }
            StorageProvider::LocalFs { .. } => panic!("expected object store"),
        }
    }

    #[test]
    fn test_credentials_without_bucket_is_error() {
        let mut settings = StorageSettings::default();
        settings.object_store.access_key_id = Some("key".into());
        settings.object_store.secret_access_key = Some("secret".into());

        let err = StorageConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(err, StorageError::Configuration(_)));
    }

    #[test]
    fn test_retry_policy_makes_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, 3);
    }
}
