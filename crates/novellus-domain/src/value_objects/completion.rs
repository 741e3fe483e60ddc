//! Request, response, and outcome value objects for the model manager.

use serde::{Deserialize, Serialize};

use crate::value_objects::embedding::Embedding;
use crate::value_objects::search::ScoredRecord;
use crate::value_objects::types::ModelId;

/// Token counts reported by (or estimated for) one provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt/input
    pub prompt_tokens: u64,
    /// Tokens produced in the completion/output
    pub completion_tokens: u64,
}

impl TokenUsage {
    /// Total tokens across prompt and completion.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// A single completion call handed to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Configured model to invoke
    pub model: ModelId,
    /// Prompt text
    pub prompt: String,
    /// Output cap, when the caller constrains it
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a request with defaults for the optional knobs.
    pub fn new(model: ModelId, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// A successful provider completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated text
    pub content: String,
    /// Model that actually served the call
    pub model: ModelId,
    /// Actual token usage as reported by the provider
    pub usage: TokenUsage,
}

/// Result of a `complete` operation, cached or generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionOutcome {
    /// Generated (or cached) text
    pub content: String,
    /// Model that served the request; `None` for cache hits
    pub model_used: Option<ModelId>,
    /// Token usage; `None` for cache hits
    pub tokens_used: Option<TokenUsage>,
    /// Whether the response came from the semantic cache
    pub cached: bool,
    /// Wall-clock latency of the whole operation
    pub latency_ms: u64,
}

/// Result of an `embed` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedOutcome {
    /// One vector per input text, in input order
    pub vectors: Vec<Embedding>,
    /// Provider-facing model that produced the vectors
    pub model_used: ModelId,
    /// Wall-clock latency of the whole operation
    pub latency_ms: u64,
}

/// Result of a `search` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Ranked matches
    pub results: Vec<ScoredRecord>,
    /// Model used to embed the query
    pub model_used: ModelId,
    /// Wall-clock latency of embed + store query
    pub latency_ms: u64,
}
