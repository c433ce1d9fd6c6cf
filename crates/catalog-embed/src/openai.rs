//! OpenAI embeddings adapter (`POST /v1/embeddings`).
//!
//! A missing or rejected key is a `ProviderAuth` failure; every other
//! unsuccessful call is `ProviderUpstream`. One attempt per call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use catalog_core::config::{EmbeddingSettings, DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_EMBEDDING_ENDPOINT, DEFAULT_EMBEDDING_MODEL};
use catalog_core::traits::Embedder;
use catalog_core::types::EmbeddingVector;
use catalog_core::{Result, SearchError};

pub const MISSING_KEY_MESSAGE: &str = "OPENAI_API_KEY not configured in server secrets";

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    dimensions: usize,
    /// Sent to the API only when it differs from the model's native size.
    request_dimensions: Option<usize>,
}

impl OpenAiEmbedder {
    /// The key may be absent; the failure then surfaces on the first call.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
            request_dimensions: None,
        }
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Self {
        let mut embedder = Self::new(settings.api_key.clone())
            .with_model(settings.model.clone())
            .with_endpoint(settings.endpoint.clone());
        if settings.dimensions != DEFAULT_EMBEDDING_DIMENSIONS {
            embedder = embedder.with_dimensions(settings.dimensions);
        }
        embedder
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    pub fn has_credential(&self) -> bool { self.api_key.is_some() }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn upstream(message: impl Into<String>) -> SearchError { SearchError::ProviderUpstream(message.into()) }

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dim(&self) -> usize { self.dimensions }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let mut out = self.embed_batch(&[text.to_string()]).await?;
        out.pop().ok_or_else(|| upstream("OpenAI embedding failed: empty response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>> {
        let Some(api_key) = self.api_key.as_deref() else {
            error!(provider = "OpenAI", "embedding credential missing");
            return Err(SearchError::ProviderAuth(MISSING_KEY_MESSAGE.to_string()));
        };
        if texts.is_empty() { return Ok(Vec::new()); }

        debug!(provider = "OpenAI", batch_size = texts.len(), model = %self.model, "embedding batch");
        let body = EmbeddingRequest { model: &self.model, input: texts, dimensions: self.request_dimensions };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "OpenAI", error = %e, "request failed");
                upstream(format!("OpenAI embedding failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&raw).map(|e| e.error.message).unwrap_or(raw);
            error!(provider = "OpenAI", %status, "API error");
            if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
                return Err(SearchError::ProviderAuth(format!(
                    "OpenAI rejected the configured OPENAI_API_KEY ({status}): {detail}"
                )));
            }
            return Err(upstream(format!("OpenAI embedding failed ({status}): {detail}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| upstream(format!("OpenAI embedding failed: unreadable response: {e}")))?;
        let mut data = parsed.data;
        if data.len() != texts.len() {
            return Err(upstream(format!(
                "OpenAI embedding failed: expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);
        data.into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimensions {
                    Ok(EmbeddingVector::new(d.embedding))
                } else {
                    Err(upstream(format!(
                        "OpenAI embedding failed: expected dimension {}, got {}",
                        self.dimensions,
                        d.embedding.len()
                    )))
                }
            })
            .collect()
    }
}
