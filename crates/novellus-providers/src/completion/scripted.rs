//! Scripted completion provider
//!
//! Test double with programmable outcomes: failover, rate-limit, and
//! burst scenarios script a queue of results and assert on per-model call
//! counts afterwards. With an empty script it echoes the prompt.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::CompletionProvider;
use novellus_domain::registry::completion::{
    COMPLETION_PROVIDERS, CompletionProviderConfig, CompletionProviderEntry,
};
use novellus_domain::value_objects::{CompletionRequest, CompletionResponse, TokenUsage};
use tokio::sync::Mutex;

/// Programmable completion provider for tests and dry runs.
pub struct ScriptedCompletionProvider {
    script: Mutex<VecDeque<Result<String>>>,
    calls: DashMap<String, u64>,
}

impl Default for ScriptedCompletionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedCompletionProvider {
    /// Create a provider with an empty script (echo mode).
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: DashMap::new(),
        }
    }

    /// Queue a successful response.
    pub async fn push_ok(&self, content: impl Into<String>) {
        self.script.lock().await.push_back(Ok(content.into()));
    }

    /// Queue a failure.
    pub async fn push_err(&self, error: Error) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Calls served for one model so far.
    #[must_use]
    pub fn call_count(&self, model: &str) -> u64 {
        self.calls.get(model).map_or(0, |c| *c)
    }

    /// Calls served across all models.
    #[must_use]
    pub fn total_calls(&self) -> u64 {
        self.calls.iter().map(|e| *e.value()).sum()
    }

    fn estimate(text: &str) -> u64 {
        (text.len() as u64).div_ceil(4)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletionProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse> {
        *self
            .calls
            .entry(request.model.as_str().to_owned())
            .or_insert(0) += 1;

        let next = self.script.lock().await.pop_front();
        let content = match next {
            Some(Ok(content)) => content,
            Some(Err(e)) => return Err(e),
            None => format!("scripted:{}", request.prompt),
        };

        Ok(CompletionResponse {
            usage: TokenUsage {
                prompt_tokens: Self::estimate(&request.prompt),
                completion_tokens: Self::estimate(&content),
            },
            content,
            model: request.model.clone(),
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }
}

fn scripted_completion_factory(
    _config: &CompletionProviderConfig,
) -> std::result::Result<Arc<dyn CompletionProvider>, String> {
    Ok(Arc::new(ScriptedCompletionProvider::new()))
}

#[linkme::distributed_slice(COMPLETION_PROVIDERS)]
static SCRIPTED_PROVIDER: CompletionProviderEntry = CompletionProviderEntry {
    name: "scripted",
    description: "Programmable completion outcomes for tests and dry runs",
    build: scripted_completion_factory,
};
