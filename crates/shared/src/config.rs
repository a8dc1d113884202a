//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// Document processing configuration.
    #[serde(default)]
    pub processing: ProcessingSettings,
    /// Embedding provider configuration.
    #[serde(default)]
    pub embedding: EmbeddingSettings,
}

/// Storage configuration shared by both backends.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Root directory for the filesystem backend.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Base address the filesystem backend builds file URLs from.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Upper bound on attempts for a bulk delete.
    #[serde(default = "default_delete_max_attempts")]
    pub delete_max_attempts: u32,
    /// Reject path resolution when a document holds more than one file.
    #[serde(default)]
    pub strict_path_resolution: bool,
    /// S3-compatible object store settings.
    #[serde(default)]
    pub object_store: ObjectStoreSettings,
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:4001/api/documents/files".to_string()
}

fn default_delete_max_attempts() -> u32 {
    3
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            public_base_url: default_public_base_url(),
            delete_max_attempts: default_delete_max_attempts(),
            strict_path_resolution: false,
            object_store: ObjectStoreSettings::default(),
        }
    }
}

impl StorageSettings {
    /// Whether object-store credentials are configured.
    ///
    /// This is the backend selection predicate: both the access key id and
    /// the secret must be present and non-blank.
    #[must_use]
    pub fn has_object_store_credentials(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.object_store.access_key_id) && present(&self.object_store.secret_access_key)
    }
}

/// S3-compatible object store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectStoreSettings {
    /// Endpoint URL, e.g. `https://nyc3.digitaloceanspaces.com`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Region name.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: Option<String>,
    /// Access key id.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Override for public file URLs (CDN in front of the bucket).
    #[serde(default)]
    pub public_base_url: Option<String>,
}

fn default_endpoint() -> String {
    "https://nyc3.digitaloceanspaces.com".to_string()
}

fn default_region() -> String {
    "nyc3".to_string()
}

impl Default for ObjectStoreSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            region: default_region(),
            bucket: None,
            access_key_id: None,
            secret_access_key: None,
            public_base_url: None,
        }
    }
}

/// Document processing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingSettings {
    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,
    /// Trailing sentences repeated at the start of the next chunk.
    #[serde(default = "default_chunk_overlap_sentences")]
    pub chunk_overlap_sentences: usize,
    /// Texts sent per embedding request.
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,
    /// Seconds to wait for a worker before giving up (0 disables the timeout).
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,
}

fn default_chunk_max_chars() -> usize {
    1000
}

fn default_chunk_overlap_sentences() -> usize {
    1
}

fn default_embedding_batch_size() -> usize {
    64
}

fn default_worker_timeout_secs() -> u64 {
    300 // 5 minutes
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            chunk_max_chars: default_chunk_max_chars(),
            chunk_overlap_sentences: default_chunk_overlap_sentences(),
            embedding_batch_size: default_embedding_batch_size(),
            worker_timeout_secs: default_worker_timeout_secs(),
        }
    }
}

/// Embedding provider configuration (OpenAI-compatible API).
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingSettings {
    /// API base URL.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Embedding model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("NOTES").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
