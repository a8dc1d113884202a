//! Embedding provider seam and an OpenAI-compatible HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use notes_shared::EmbeddingSettings;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ProcessingError;

/// Turns texts into embedding vectors, one per input, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProcessingError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbedder {
    /// Build a client from settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, ProcessingError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(ProcessingError::embedding)?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", settings.api_base.trim_end_matches('/')),
            api_key: settings.api_key.clone().filter(|k| !k.is_empty()),
            model: settings.model.clone(),
        })
    }
}

/// Order vectors by their response index and check the count.
fn into_ordered(
    mut data: Vec<EmbeddingData>,
    expected: usize,
) -> Result<Vec<Vec<f32>>, ProcessingError> {
    if data.len() != expected {
        return Err(ProcessingError::EmbeddingMismatch {
            expected,
            actual: data.len(),
        });
    }
    data.sort_by_key(|d| d.index);
    if data.iter().enumerate().any(|(i, d)| d.index != i) {
        return Err(ProcessingError::embedding("response indices are not contiguous"));
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProcessingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(ProcessingError::embedding)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProcessingError::embedding(format!("{status}: {body}")));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(ProcessingError::embedding)?;
        debug!(model = %self.model, count = texts.len(), "Received embeddings");
        into_ordered(parsed.data, texts.len())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
