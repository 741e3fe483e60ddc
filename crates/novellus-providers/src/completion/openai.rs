//! OpenAI completion provider
//!
//! Single-turn completions via `v1/chat/completions`. One provider instance
//! serves every configured OpenAI model; the request names the model.

use std::sync::Arc;

use async_trait::async_trait;
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::CompletionProvider;
use novellus_domain::registry::completion::{
    COMPLETION_PROVIDERS, CompletionProviderConfig, CompletionProviderEntry,
};
use novellus_domain::value_objects::{CompletionRequest, CompletionResponse, TokenUsage};
use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI `v1/chat/completions` gateway.
pub struct OpenAiCompletionProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl OpenAiCompletionProvider {
    /// Create a provider with explicit connection settings.
    #[must_use]
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: request.model.as_str(),
                messages: [ChatMessage {
                    role: "user",
                    content: &request.prompt,
                }],
                max_tokens: request.max_tokens,
                temperature: request.temperature,
            })
            .send()
            .await
            .map_err(|e| {
                Error::provider_unavailable_with_source("openai", "completion request failed", e)
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            return Err(Error::rate_limited(
                request.model.as_str().to_owned(),
                retry_after_ms,
            ));
        }
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::invalid_request(format!(
                "openai completion rejected ({status}): {body}"
            )));
        }
        if !status.is_success() {
            return Err(Error::provider_unavailable(
                "openai",
                format!("completion returned {status}"),
            ));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            Error::provider_unavailable_with_source("openai", "malformed completion response", e)
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::provider_unavailable("openai", "no completion choices"))?;

        let usage = parsed.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
            usage,
        })
    }

    fn provider_name(&self) -> &str {
        "openai"
    }
}

fn openai_completion_factory(
    config: &CompletionProviderConfig,
) -> std::result::Result<Arc<dyn CompletionProvider>, String> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| "OpenAI completion provider requires api_key in config".to_owned())?;
    Ok(Arc::new(OpenAiCompletionProvider::new(
        api_key,
        config.base_url.clone(),
    )))
}

#[linkme::distributed_slice(COMPLETION_PROVIDERS)]
static OPENAI_PROVIDER: CompletionProviderEntry = CompletionProviderEntry {
    name: "openai",
    description: "OpenAI v1/chat/completions API",
    build: openai_completion_factory,
};
