//! Core logic for notes document ingestion.
//!
//! This crate has no web dependencies. It owns file storage, document
//! processing and the coordination between the two.
//!
//! # Modules
//!
//! - `storage` - Filesystem and object store backends behind one interface
//! - `processing` - Text extraction, chunking and embedding workers
//! - `ingest` - Store, process and index an upload with cleanup on failure

pub mod ingest;
pub mod processing;
pub mod storage;
