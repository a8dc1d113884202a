//! Shared configuration and error types for Namespace Notes.
//!
//! This crate provides what every other crate needs:
//! - Layered configuration (files + `NOTES__*` environment variables)
//! - The application-wide error type reported at the service boundary

pub mod config;
pub mod error;

pub use config::{
    AppConfig, EmbeddingSettings, ObjectStoreSettings, ProcessingSettings, StorageSettings,
};
pub use error::{AppError, AppResult};
