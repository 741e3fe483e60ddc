//! Ollama completion provider
//!
//! Non-streaming generation via `/api/generate`.

use std::sync::Arc;

use async_trait::async_trait;
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::CompletionProvider;
use novellus_domain::registry::completion::{
    COMPLETION_PROVIDERS, CompletionProviderConfig, CompletionProviderEntry,
};
use novellus_domain::value_objects::{CompletionRequest, CompletionResponse, TokenUsage};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama `/api/generate` gateway.
pub struct OllamaCompletionProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl OllamaCompletionProvider {
    /// Create a provider with explicit connection settings.
    #[must_use]
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
        }
    }
}

#[async_trait]
impl CompletionProvider for OllamaCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let options = if request.max_tokens.is_some() || request.temperature.is_some() {
            Some(GenerateOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            })
        } else {
            None
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&GenerateRequest {
                model: request.model.as_str(),
                prompt: &request.prompt,
                stream: false,
                options,
            })
            .send()
            .await
            .map_err(|e| {
                Error::provider_unavailable_with_source("ollama", "generate request failed", e)
            })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::invalid_request(format!(
                "ollama generate rejected ({status}): {body}"
            )));
        }
        if !status.is_success() {
            return Err(Error::provider_unavailable(
                "ollama",
                format!("generate returned {status}"),
            ));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            Error::provider_unavailable_with_source("ollama", "malformed generate response", e)
        })?;

        Ok(CompletionResponse {
            content: parsed.response,
            model: request.model.clone(),
            usage: TokenUsage {
                prompt_tokens: parsed.prompt_eval_count.unwrap_or(0),
                completion_tokens: parsed.eval_count.unwrap_or(0),
            },
        })
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

fn ollama_completion_factory(
    config: &CompletionProviderConfig,
) -> std::result::Result<Arc<dyn CompletionProvider>, String> {
    Ok(Arc::new(OllamaCompletionProvider::new(
        config.base_url.clone(),
    )))
}

#[linkme::distributed_slice(COMPLETION_PROVIDERS)]
static OLLAMA_PROVIDER: CompletionProviderEntry = CompletionProviderEntry {
    name: "ollama",
    description: "Ollama local generation daemon",
    build: ollama_completion_factory,
};
