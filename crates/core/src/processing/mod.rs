//! Document processing: extract text, chunk it, embed each chunk.
//!
//! Work runs off the request path in a [`DocumentWorker`]; callers get back
//! one [`WorkerResponse`] carrying either the [`ProcessedDocument`] or an
//! error message.

mod chunk;
mod embed;
mod error;
mod extract;
mod pipeline;
mod types;
mod worker;

pub use chunk::{Chunker, SentenceChunker};
pub use embed::{Embedder, HttpEmbedder};
pub use error::ProcessingError;
pub use extract::{FormatExtractor, PdfExtractor, PlainTextExtractor, TextExtractor};
pub use pipeline::DocumentPipeline;
pub use types::{DocumentChunk, ProcessedDocument, ProcessingRequest, WorkerResponse};
pub use worker::{DocumentWorker, WorkerHandle};
