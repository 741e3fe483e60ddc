//! OpenAI embedding provider
//!
//! Calls the `v1/embeddings` endpoint with Bearer auth. Batches are chunked
//! to the configured batch size; each returned vector is dimension-checked
//! before it leaves this module.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use novellus_domain::constants::embedding::{
    DEFAULT_EMBED_BATCH_SIZE, DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_MODEL,
};
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::EmbeddingProvider;
use novellus_domain::registry::embedding::{
    EMBEDDING_PROVIDERS, EmbeddingProviderConfig, EmbeddingProviderEntry,
};
use novellus_domain::value_objects::Embedding;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI `v1/embeddings` gateway.
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    /// Create a provider for one model with explicit connection settings.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<String>,
        model: impl Into<String>,
        dimensions: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            model: model.into(),
            dimensions,
            batch_size: batch_size.max(1),
        }
    }

    async fn embed_chunk(&self, chunk: &[String]) -> Result<Vec<Embedding>> {
        let started = Instant::now();
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&EmbeddingsRequest {
                model: &self.model,
                input: chunk,
            })
            .send()
            .await
            .map_err(|e| {
                Error::provider_unavailable_with_source("openai", "embeddings request failed", e)
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            return Err(Error::rate_limited(self.model.clone(), retry_after_ms));
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::invalid_request(format!(
                "openai embeddings rejected ({status}): {body}"
            )));
        }
        if !status.is_success() {
            return Err(Error::provider_unavailable(
                "openai",
                format!("embeddings returned {status}"),
            ));
        }

        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            Error::provider_unavailable_with_source("openai", "malformed embeddings response", e)
        })?;

        if parsed.data.len() != chunk.len() {
            return Err(Error::embedding(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                parsed.data.len()
            )));
        }

        novellus_domain::debug!(
            "embedding",
            "openai batch embedded",
            &format!(
                "texts = {}, latency_ms = {}",
                chunk.len(),
                started.elapsed().as_millis()
            )
        );

        parsed
            .data
            .into_iter()
            .map(|d| {
                if d.embedding.len() != self.dimensions {
                    return Err(Error::dimension(self.dimensions, d.embedding.len()));
                }
                Ok(Embedding::new(d.embedding, self.model.clone()))
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Err(Error::invalid_argument("embed_batch requires input texts"));
        }

        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

fn openai_embedding_factory(
    config: &EmbeddingProviderConfig,
) -> std::result::Result<Arc<dyn EmbeddingProvider>, String> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| "OpenAI embedding provider requires api_key in config".to_owned())?;
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_owned());
    let provider = OpenAiEmbeddingProvider::new(
        api_key,
        config.base_url.clone(),
        model,
        config.dimensions.unwrap_or(DEFAULT_EMBEDDING_DIM),
        config.batch_size.unwrap_or(DEFAULT_EMBED_BATCH_SIZE),
    );
    Ok(Arc::new(provider))
}

#[linkme::distributed_slice(EMBEDDING_PROVIDERS)]
static OPENAI_PROVIDER: EmbeddingProviderEntry = EmbeddingProviderEntry {
    name: "openai",
    description: "OpenAI v1/embeddings API",
    build: openai_embedding_factory,
};
