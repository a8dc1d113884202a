//! Document worker dispatch.
//!
//! Each dispatch spawns an independent task that owns its request outright
//! and answers through a oneshot channel, so a caller gets exactly one
//! [`WorkerResponse`]. Panics, dropped tasks and timeouts are reported as
//! `WorkerResponse::Error` like any other failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::{Instrument, debug, error, info, info_span, warn};

use super::pipeline::DocumentPipeline;
use super::types::{ProcessingRequest, WorkerResponse};

/// Dispatches processing requests to isolated tasks.
#[derive(Clone)]
pub struct DocumentWorker {
    pipeline: Arc<DocumentPipeline>,
    timeout: Option<Duration>,
}

impl DocumentWorker {
    /// Create a worker without a timeout.
    #[must_use]
    pub fn new(pipeline: Arc<DocumentPipeline>) -> Self {
        Self {
            pipeline,
            timeout: None,
        }
    }

    /// Give up waiting after `timeout`. `None` waits indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Start processing in the background.
    #[must_use = "dropping the handle discards the worker's response"]
    pub fn dispatch(&self, request: ProcessingRequest) -> WorkerHandle {
        let (tx, rx) = oneshot::channel();
        let pipeline = Arc::clone(&self.pipeline);
        let document_id = request.document_id.clone();
        let span = info_span!("document_worker", document_id = %document_id);

        tokio::spawn(
            async move {
                let started = Instant::now();
                let response = match pipeline.run(request).await {
                    Ok(document) => {
                        info!(
                            chunks = document.chunks.len(),
                            elapsed_ms = started.elapsed().as_millis(),
                            "Document processed"
                        );
                        WorkerResponse::Document(document)
                    }
                    Err(e) => {
                        warn!(error = %e, "Document processing failed");
                        WorkerResponse::Error(e.to_string())
                    }
                };
                if tx.send(response).is_err() {
                    debug!("Caller stopped waiting for the worker response");
                }
            }
            .instrument(span),
        );

        WorkerHandle {
            document_id,
            receiver: rx,
        }
    }

    /// Dispatch and wait using the configured timeout.
    pub async fn process(&self, request: ProcessingRequest) -> WorkerResponse {
        self.dispatch(request).wait(self.timeout).await
    }
}

/// Pending response of a dispatched worker.
#[derive(Debug)]
pub struct WorkerHandle {
    document_id: String,
    receiver: oneshot::Receiver<WorkerResponse>,
}

impl WorkerHandle {
    /// Document being processed.
    #[must_use]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Wait for the worker's single response.
    ///
    /// A timed-out worker keeps running to completion; its response is
    /// discarded.
    pub async fn wait(self, timeout: Option<Duration>) -> WorkerResponse {
        let received = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.receiver).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(
                        document_id = %self.document_id,
                        timeout_ms = limit.as_millis(),
                        "Document worker timed out"
                    );
                    return WorkerResponse::Error(format!(
                        "document processing timed out after {}ms",
                        limit.as_millis()
                    ));
                }
            },
            None => self.receiver.await,
        };

        received.unwrap_or_else(|_| {
            error!(document_id = %self.document_id, "Document worker terminated without a response");
            WorkerResponse::Error("document worker terminated unexpectedly".to_string())
        })
    }
}
