//! Ollama embedding provider
//!
//! Talks to a local or remote Ollama daemon via `/api/embed`.

use std::sync::Arc;

use async_trait::async_trait;
use novellus_domain::constants::embedding::{DEFAULT_EMBED_BATCH_SIZE, DEFAULT_EMBEDDING_DIM};
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::EmbeddingProvider;
use novellus_domain::registry::embedding::{
    EMBEDDING_PROVIDERS, EmbeddingProviderConfig, EmbeddingProviderEntry,
};
use novellus_domain::value_objects::Embedding;
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "nomic-embed-text";

/// Ollama `/api/embed` gateway.
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for one model with explicit connection settings.
    #[must_use]
    pub fn new(
        base_url: Option<String>,
        model: impl Into<String>,
        dimensions: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            model: model.into(),
            dimensions,
            batch_size: batch_size.max(1),
        }
    }

    async fn embed_chunk(&self, chunk: &[String]) -> Result<Vec<Embedding>> {
        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&EmbedRequest {
                model: &self.model,
                input: chunk,
            })
            .send()
            .await
            .map_err(|e| {
                Error::provider_unavailable_with_source("ollama", "embed request failed", e)
            })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::invalid_request(format!(
                "ollama embed rejected ({status}): {body}"
            )));
        }
        if !status.is_success() {
            return Err(Error::provider_unavailable(
                "ollama",
                format!("embed returned {status}"),
            ));
        }

        let parsed: EmbedResponse = response.json().await.map_err(|e| {
            Error::provider_unavailable_with_source("ollama", "malformed embed response", e)
        })?;

        if parsed.embeddings.len() != chunk.len() {
            return Err(Error::embedding(format!(
                "expected {} embeddings, got {}",
                chunk.len(),
                parsed.embeddings.len()
            )));
        }

        parsed
            .embeddings
            .into_iter()
            .map(|v| {
                if v.len() != self.dimensions {
                    return Err(Error::dimension(self.dimensions, v.len()));
                }
                Ok(Embedding::new(v, self.model.clone()))
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
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
        "ollama"
    }
}

fn ollama_embedding_factory(
    config: &EmbeddingProviderConfig,
) -> std::result::Result<Arc<dyn EmbeddingProvider>, String> {
    let provider = OllamaEmbeddingProvider::new(
        config.base_url.clone(),
        config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
        config.dimensions.unwrap_or(DEFAULT_EMBEDDING_DIM),
        config.batch_size.unwrap_or(DEFAULT_EMBED_BATCH_SIZE),
    );
    Ok(Arc::new(provider))
}

#[linkme::distributed_slice(EMBEDDING_PROVIDERS)]
static OLLAMA_PROVIDER: EmbeddingProviderEntry = EmbeddingProviderEntry {
    name: "ollama",
    description: "Ollama local embedding daemon",
    build: ollama_embedding_factory,
};
