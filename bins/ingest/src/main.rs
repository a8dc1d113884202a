//! Namespace Notes ingestion CLI.
//!
//! Stores files in the configured backend, runs them through the document
//! worker and writes processed documents as JSON lines to stdout.
//!
//! ```bash
//! notes-ingest ingest ns1 doc1 ./report.pdf
//! notes-ingest list ns1
//! notes-ingest delete ns1 doc1
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notes_core::ingest::{IndexError, Ingestor, VectorIndex};
use notes_core::processing::{DocumentPipeline, DocumentWorker, HttpEmbedder, ProcessedDocument};
use notes_core::storage::{StorageBackend, StorageConfig, StorageService, StoredFileHandle};
use notes_shared::AppConfig;

#[derive(Parser)]
#[command(name = "notes-ingest")]
#[command(about = "Store, process and index documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store and process a file as a document
    Ingest {
        /// Namespace the document belongs to
        namespace: String,
        /// Document identifier
        document_id: String,
        /// File to ingest
        path: PathBuf,
        /// MIME type; guessed from the extension when omitted
        mime: Option<String>,
    },

    /// List the stored files of a namespace
    List {
        /// Namespace to list
        namespace: String,
    },

    /// Delete a whole namespace, or one document in it
    Delete {
        /// Namespace to delete from
        namespace: String,
        /// Only delete this document
        document_id: Option<String>,
    },
}

/// Index sink writing each processed document as one JSON line.
struct JsonLinesIndex;

impl VectorIndex for JsonLinesIndex {
    async fn upsert(
        &self,
        namespace_id: &str,
        document: &ProcessedDocument,
    ) -> Result<(), IndexError> {
        let line = serde_json::to_string(&serde_json::json!({
            "namespaceId": namespace_id,
            "document": document,
        }))
        .map_err(IndexError::new)?;
        println!("{line}");
        Ok(())
    }
}

fn guess_mime(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("md" | "markdown") => "text/markdown",
        Some("json") => "application/json",
        Some("txt" | "text" | "log") => "text/plain",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// Copy the input aside, since saving consumes the handle's file.
async fn stage_copy(path: &Path, mime: Option<String>) -> anyhow::Result<StoredFileHandle> {
    let original_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .context("input path has no file name")?
        .to_string();
    let staged = std::env::temp_dir().join(format!("notes-ingest-{}", uuid::Uuid::new_v4()));
    tokio::fs::copy(path, &staged)
        .await
        .with_context(|| format!("failed to stage {}", path.display()))?;

    let mime_type = mime.unwrap_or_else(|| guess_mime(path).to_string());
    Ok(StoredFileHandle::new(staged, original_name, mime_type))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries JSON output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notes=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    let storage = Arc::new(StorageBackend::from_config(StorageConfig::from_settings(
        &config.storage,
    )?)?);

    match cli.command {
        Commands::Ingest {
            namespace,
            document_id,
            path,
            mime,
        } => {
            let embedder = Arc::new(HttpEmbedder::new(&config.embedding)?);
            let pipeline = DocumentPipeline::from_settings(&config.processing, embedder);
            let timeout = match config.processing.worker_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };
            let worker = DocumentWorker::new(Arc::new(pipeline)).with_timeout(timeout);
            let ingestor = Ingestor::new(Arc::clone(&storage), worker, Arc::new(JsonLinesIndex));

            let handle = stage_copy(&path, mime).await?;
            let report = ingestor.ingest(&namespace, &document_id, handle).await?;
            info!(key = %report.key, chunks = report.chunk_count, "Ingestion complete");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::List { namespace } => {
            let files = storage.list_files_in_namespace(&namespace).await?;
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        Commands::Delete {
            namespace,
            document_id,
        } => {
            match document_id.as_deref() {
                Some(document_id) => {
                    storage
                        .delete_file_from_workspace(&namespace, document_id)
                        .await?;
                }
                None => storage.delete_workspace_files(&namespace).await?,
            }
            println!(
                "{}",
                serde_json::json!({ "namespaceId": namespace, "documentId": document_id, "deleted": true })
            );
        }
    }

    Ok(())
}
