//! Model descriptor entity - one configured LLM or embedding backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::routing::COST_OUTPUT_BLEND;
use crate::value_objects::{Capability, ModelId, ModelStatus};

/// Declared rate limits for one model.
///
/// Canonical windows: requests/minute, tokens/minute, requests/day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    /// Requests per minute
    pub rpm: u32,
    /// Tokens per minute
    pub tpm: u32,
    /// Requests per day
    pub rpd: u32,
}

/// Per-token pricing for one model, in account currency units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelCost {
    /// Cost per input token
    pub input_per_token: f64,
    /// Cost per output token
    pub output_per_token: f64,
}

impl ModelCost {
    /// Blended per-token cost used by cost-aware routing
    /// (`input + BLEND * output`).
    #[must_use]
    pub fn blended(&self) -> f64 {
        self.input_per_token + COST_OUTPUT_BLEND * self.output_per_token
    }
}

/// Rolling health estimate for one model, maintained online by the router.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelHealth {
    /// Fraction of recent calls that succeeded, in [0, 1]
    pub success_rate: f64,
    /// Median latency over the sample window
    pub p50_latency_ms: f64,
    /// 99th percentile latency over the sample window
    pub p99_latency_ms: f64,
    /// When the model last returned an error
    pub last_error_at: Option<DateTime<Utc>>,
}

impl Default for ModelHealth {
    fn default() -> Self {
        Self {
            success_rate: 1.0,
            p50_latency_ms: 0.0,
            p99_latency_ms: 0.0,
            last_error_at: None,
        }
    }
}

/// One configured model backend.
///
/// Loaded from configuration at init; only `status` and `health` mutate
/// online, and only the router/manager mutate them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Configured model identifier
    pub model_id: ModelId,
    /// Provider family serving this model (openai, ollama, ...)
    pub provider: String,
    /// What the model can do
    pub capabilities: Vec<Capability>,
    /// Prompt-side token window
    pub context_window: u32,
    /// Output token cap
    pub max_output_tokens: u32,
    /// Per-token pricing
    pub cost: ModelCost,
    /// Declared rate limits
    pub rate_limits: RateLimits,
    /// Selection priority; higher wins in weighted strategies
    pub priority: i32,
    /// Online status
    pub status: ModelStatus,
    /// Rolling health estimate
    pub health: ModelHealth,
    /// Per-call timeout override in milliseconds
    pub timeout_ms: Option<u64>,
}

impl ModelDescriptor {
    /// Whether this model declares the capability.
    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Whether the router may pick this model at all
    /// (`active` or `degraded`, never `disabled`).
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        matches!(self.status, ModelStatus::Active | ModelStatus::Degraded)
    }
}
