//! Rate Limiter Provider Registry

use std::collections::HashMap;

/// Configuration for rate limiter provider creation
#[derive(Debug, Clone, Default)]
pub struct RateLimiterProviderConfig {
    /// Provider name (e.g. "local", "redis")
    pub provider: String,
    /// Redis connection string for the distributed variant
    pub redis_url: Option<String>,
    /// Additional provider-specific configuration
    pub extra: HashMap<String, String>,
}

crate::impl_config_builder!(RateLimiterProviderConfig {
    /// Set the Redis connection string
    redis_url: with_redis_url(into String),
});

crate::impl_registry!(
    provider_trait: crate::ports::providers::RateLimiterProvider,
    config_type: RateLimiterProviderConfig,
    entry_type: RateLimiterProviderEntry,
    slice_name: RATE_LIMITER_PROVIDERS,
    resolve_fn: resolve_rate_limiter_provider,
    list_fn: list_rate_limiter_providers
);
