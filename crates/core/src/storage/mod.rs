//! Storage service for uploaded documents.
//!
//! One interface, two interchangeable backends:
//! - Local filesystem: `<root>/<namespace>/<document>/<name>` directory tree
//! - S3-compatible object store (via Apache OpenDAL): flat
//!   `<namespace>/<document>/<name>` keys, hierarchy emulated with prefixes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 StorageService (trait)                          │
//! │  save_file · construct_file_url · get_file_path                 │
//! │  list_files_in_namespace · delete_workspace_files               │
//! │  delete_file_from_workspace                                     │
//! ├──────────────────────────────┬──────────────────────────────────┤
//! │ LocalFilesystemStorage       │ ObjectStoreStorage<BucketClient> │
//! │ tokio::fs, atomic rename     │ OpenDAL S3, recursive listing,   │
//! │                              │ bounded-retry bulk delete        │
//! └──────────────────────────────┴──────────────────────────────────┘
//! ```
//!
//! [`StorageBackend`] picks one of the two at startup from [`StorageConfig`].

mod bucket;
mod config;
mod error;
mod key;
mod local;
mod object_store;
mod service;
mod types;

pub use bucket::{BucketClient, Listing, OpendalBucket};
pub use config::{RetryPolicy, StorageConfig, StorageProvider};
pub use error::StorageError;
pub use key::FileKey;
pub use local::LocalFilesystemStorage;
pub use object_store::{MAX_LIST_DEPTH, ObjectStoreStorage};
pub use service::{StorageBackend, StorageService};
pub use types::{FileDetail, StoredFileHandle};
