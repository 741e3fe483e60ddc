//! Configuration types deserialized from the `settings:` section of the
//! YAML config files. Every field has a default so a minimal file stays
//! minimal; validation decides what is actually required.

use std::fmt;

use novellus_domain::constants::cache::{
    DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_SIMILARITY_THRESHOLD, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_SWEEP_BATCH,
};
use novellus_domain::constants::embedding::{DEFAULT_EMBED_BATCH_SIZE, DEFAULT_EMBEDDING_DIM};
use novellus_domain::constants::routing::{
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_PER_CALL_TIMEOUT_MS, DEFAULT_PER_REQUEST_TIMEOUT_MS,
};
use novellus_domain::entities::{ModelCost, ModelDescriptor, ModelHealth, RateLimits};
use novellus_domain::value_objects::{Capability, ModelId, ModelStatus, RouteStrategy};
use novellus_application::AdaptiveWeights;
use serde::{Deserialize, Serialize};

const REDACTED: &str = "REDACTED";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configured model backends
    pub models: Vec<ModelSettings>,
    /// Embedding gateway settings
    pub embedding: EmbeddingSettings,
    /// Semantic cache settings
    pub cache: CacheSettings,
    /// Router strategy settings
    pub router: RouterSettings,
    /// Rate limiter backend settings
    pub rate_limiter: RateLimiterSettings,
    /// Vector store backend settings
    pub vector_store: VectorStoreSettings,
    /// Request timeouts
    pub timeouts: TimeoutSettings,
    /// Retry/backoff policy
    pub retry: RetrySettings,
    /// Logging setup
    pub logging: LoggingSettings,
}

/// One configured model backend.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model identifier passed to the provider
    pub model_id: String,
    /// Provider family serving this model (openai, ollama, scripted)
    pub provider: String,
    /// Declared capabilities
    pub capabilities: Vec<Capability>,
    /// Prompt-side token window
    pub context_window: u32,
    /// Output token cap
    pub max_output_tokens: u32,
    /// Declared rate limits; 0 means unlimited for that window
    pub rate_limits: RateLimits,
    /// Per-token pricing
    pub cost: CostSettings,
    /// Selection priority; higher wins in weighted strategies
    pub priority: i32,
    /// Per-call timeout override in milliseconds
    pub timeout_ms: Option<u64>,
    /// API key for the provider family
    pub api_key: Option<String>,
    /// Base URL override for the provider family
    pub base_url: Option<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            provider: String::new(),
            capabilities: vec![Capability::Completion],
            context_window: 8192,
            max_output_tokens: 1024,
            rate_limits: RateLimits {
                rpm: 0,
                tpm: 0,
                rpd: 0,
            },
            cost: CostSettings::default(),
            priority: 0,
            timeout_ms: None,
            api_key: None,
            base_url: None,
        }
    }
}

impl fmt::Debug for ModelSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSettings")
            .field("model_id", &self.model_id)
            .field("provider", &self.provider)
            .field("capabilities", &self.capabilities)
            .field("context_window", &self.context_window)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("rate_limits", &self.rate_limits)
            .field("cost", &self.cost)
            .field("priority", &self.priority)
            .field("timeout_ms", &self.timeout_ms)
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ModelSettings {
    /// Materialize the runtime descriptor for this model.
    #[must_use]
    pub fn to_descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            model_id: ModelId::from(self.model_id.as_str()),
            provider: self.provider.clone(),
            capabilities: self.capabilities.clone(),
            context_window: self.context_window,
            max_output_tokens: self.max_output_tokens,
            cost: ModelCost {
                input_per_token: self.cost.input,
                output_per_token: self.cost.output,
            },
            rate_limits: self.rate_limits,
            priority: self.priority,
            status: ModelStatus::Active,
            health: ModelHealth::default(),
            timeout_ms: self.timeout_ms,
        }
    }
}

/// Per-token pricing as configured.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostSettings {
    /// Cost per input token
    pub input: f64,
    /// Cost per output token
    pub output: f64,
}

/// Embedding gateway settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding provider name (openai, ollama, null)
    pub provider: String,
    /// Model identifier for the provider
    pub model: Option<String>,
    /// Vector dimension; fixed per (model, embedding version)
    pub dim: usize,
    /// Texts per provider call when batching
    pub batch_size: usize,
    /// API key for cloud providers
    pub api_key: Option<String>,
    /// Base URL override
    pub base_url: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "null".to_owned(),
            model: None,
            dim: DEFAULT_EMBEDDING_DIM,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
            api_key: None,
            base_url: None,
        }
    }
}

impl fmt::Debug for EmbeddingSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddingSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("dim", &self.dim)
            .field("batch_size", &self.batch_size)
            .field("api_key", &self.api_key.as_ref().map(|_| REDACTED))
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Semantic cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Whether the cache participates in `complete`
    pub enabled: bool,
    /// Cache provider name (postgres, memory)
    pub provider: String,
    /// TTL written with new entries, in seconds
    pub default_ttl_secs: u64,
    /// Similarity threshold written with new entries
    pub default_similarity_threshold: f64,
    /// Capacity ceiling enforced by maintenance
    pub max_entries: usize,
    /// Expired entries deleted per sweep batch
    pub sweep_batch: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "memory".to_owned(),
            default_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            default_similarity_threshold: DEFAULT_CACHE_SIMILARITY_THRESHOLD,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            sweep_batch: DEFAULT_SWEEP_BATCH,
        }
    }
}

/// Router strategy settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Selection strategy
    pub strategy: RouteStrategy,
    /// Weights for the adaptive strategy
    pub adaptive_weights: WeightSettings,
}

/// Adaptive strategy weights as configured.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightSettings {
    /// Weight on inverse latency
    pub latency: f64,
    /// Weight on success rate
    pub success: f64,
    /// Weight on inverse cost
    pub cost: f64,
    /// Weight on remaining budget ratio
    pub budget: f64,
}

impl Default for WeightSettings {
    fn default() -> Self {
        let defaults = AdaptiveWeights::default();
        Self {
            latency: defaults.latency,
            success: defaults.success,
            cost: defaults.cost,
            budget: defaults.budget,
        }
    }
}

impl From<WeightSettings> for AdaptiveWeights {
    fn from(settings: WeightSettings) -> Self {
        Self {
            latency: settings.latency,
            success: settings.success,
            cost: settings.cost,
            budget: settings.budget,
        }
    }
}

/// Rate limiter backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterSettings {
    /// Limiter provider name (local, redis)
    pub provider: String,
    /// Redis connection string for the distributed variant
    pub redis_url: Option<String>,
}

impl Default for RateLimiterSettings {
    fn default() -> Self {
        Self {
            provider: "local".to_owned(),
            redis_url: None,
        }
    }
}

/// Vector store backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Store provider name (postgres, memory)
    pub provider: String,
    /// Connection string for database-backed stores
    pub database_url: Option<String>,
    /// Connection pool ceiling
    pub max_connections: Option<u32>,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "memory".to_owned(),
            database_url: None,
            max_connections: None,
        }
    }
}

/// Request timeout settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Per-provider-call timeout in milliseconds
    pub per_call_ms: u64,
    /// Whole-request timeout in milliseconds
    pub per_request_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            per_call_ms: DEFAULT_PER_CALL_TIMEOUT_MS,
            per_request_ms: DEFAULT_PER_REQUEST_TIMEOUT_MS,
        }
    }
}

/// Retry/backoff policy settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per `complete` request
    pub max_attempts: u32,
    /// First admission-wait backoff in milliseconds
    pub initial_backoff_ms: u64,
    /// Admission-wait backoff ceiling in milliseconds
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RETRIES,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

/// Logging setup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive (e.g. `info`, `novellus=debug`)
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}
