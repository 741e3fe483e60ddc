//! Semantic Cache Provider Registry

use std::collections::HashMap;

/// Configuration for semantic cache provider creation
#[derive(Debug, Clone, Default)]
pub struct SemanticCacheProviderConfig {
    /// Provider name (e.g. "postgres", "memory")
    pub provider: String,
    /// Connection string for database-backed caches
    pub database_url: Option<String>,
    /// Vector dimension of query embeddings
    pub dimensions: Option<usize>,
    /// Default entry lifetime in seconds
    pub default_ttl_secs: Option<u64>,
    /// Default per-entry similarity threshold
    pub default_threshold: Option<f64>,
    /// Additional provider-specific configuration
    pub extra: HashMap<String, String>,
}

crate::impl_config_builder!(SemanticCacheProviderConfig {
    /// Set the database connection string
    database_url: with_database_url(into String),
    /// Set the query embedding dimensions
    dimensions: with_dimensions(usize),
    /// Set the default TTL in seconds
    default_ttl_secs: with_default_ttl_secs(u64),
    /// Set the default similarity threshold
    default_threshold: with_default_threshold(f64),
});

crate::impl_registry!(
    provider_trait: crate::ports::providers::SemanticCacheProvider,
    config_type: SemanticCacheProviderConfig,
    entry_type: SemanticCacheProviderEntry,
    slice_name: SEMANTIC_CACHE_PROVIDERS,
    resolve_fn: resolve_semantic_cache_provider,
    list_fn: list_semantic_cache_providers
);
