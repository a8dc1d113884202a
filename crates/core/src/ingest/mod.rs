//! Ingestion: store an upload, process it, index the result.

mod error;
mod service;
mod types;

pub use error::{IndexError, IngestError};
pub use service::{Ingestor, sanitize_filename};
pub use types::{IngestReport, VectorIndex};
