//! Composition root
//!
//! Resolves every provider from its registry by the name configuration
//! gives it, ensures backing schemas, registers rate limits, and wires the
//! router and model manager. The resulting [`Runtime`] is the single
//! explicit handle request handlers receive; there is no process-global
//! state beyond the log facade.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use novellus_application::decorators::InstrumentedEmbeddingProvider;
use novellus_application::{
    ModelManager, ModelManagerConfig, ModelRouter, QueryMetrics, SemanticSearchService,
};
use novellus_domain::entities::ModelDescriptor;
use novellus_domain::error::Result;
use novellus_domain::ports::providers::{
    CompletionProvider, EmbeddingProvider, RateLimiterProvider, SemanticCacheProvider,
    VectorStoreProvider,
};
use novellus_domain::registry::completion::{
    CompletionProviderConfig, resolve_completion_provider,
};
use novellus_domain::registry::embedding::{EmbeddingProviderConfig, resolve_embedding_provider};
use novellus_domain::registry::rate_limiter::{
    RateLimiterProviderConfig, resolve_rate_limiter_provider,
};
use novellus_domain::registry::semantic_cache::{
    SemanticCacheProviderConfig, resolve_semantic_cache_provider,
};
use novellus_domain::registry::vector_store::{
    VectorStoreProviderConfig, resolve_vector_store_provider,
};
use novellus_domain::value_objects::ModelId;
use novellus_providers::embedding::CachedEmbeddingProvider;

use crate::config::{AppConfig, validate_app_config};

/// Memoized query embeddings kept in front of the gateway.
const EMBED_MEMO_CAPACITY: u64 = 4096;

/// Live handles to the composed system.
pub struct Runtime {
    /// The validated configuration the runtime was built from
    pub config: AppConfig,
    /// Embedding gateway (instrumented + memoized)
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Vector store
    pub store: Arc<dyn VectorStoreProvider>,
    /// Semantic cache
    pub cache: Arc<dyn SemanticCacheProvider>,
    /// Rate limiter
    pub limiter: Arc<dyn RateLimiterProvider>,
    /// Model router
    pub router: Arc<ModelRouter>,
    /// The orchestrator
    pub manager: Arc<ModelManager>,
    /// Ingestion and specialized search
    pub search: Arc<SemanticSearchService>,
    /// Shared request-path counters
    pub metrics: Arc<QueryMetrics>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Build the runtime from a validated configuration.
///
/// # Errors
///
/// Returns configuration errors for unknown provider names or missing
/// connection settings, and storage errors if schema setup fails.
pub async fn bootstrap(config: AppConfig) -> Result<Runtime> {
    validate_app_config(&config)?;

    let metrics = Arc::new(QueryMetrics::new());

    // C1: embedding gateway, instrumented then memoized.
    let mut embedding_config = EmbeddingProviderConfig::new(config.embedding.provider.clone())
        .with_dimensions(config.embedding.dim)
        .with_batch_size(config.embedding.batch_size);
    if let Some(model) = &config.embedding.model {
        embedding_config = embedding_config.with_model(model.clone());
    }
    if let Some(api_key) = &config.embedding.api_key {
        embedding_config = embedding_config.with_api_key(api_key.clone());
    }
    if let Some(base_url) = &config.embedding.base_url {
        embedding_config = embedding_config.with_base_url(base_url.clone());
    }
    let base_embedder = resolve_embedding_provider(&embedding_config)?;
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(CachedEmbeddingProvider::new(
        Arc::new(InstrumentedEmbeddingProvider::new(
            base_embedder,
            Arc::clone(&metrics),
        )),
        EMBED_MEMO_CAPACITY,
    ));

    // C2: vector store.
    let mut store_config = VectorStoreProviderConfig::new(config.vector_store.provider.clone())
        .with_dimensions(config.embedding.dim);
    if let Some(url) = &config.vector_store.database_url {
        store_config = store_config.with_database_url(url.clone());
    }
    if let Some(max) = config.vector_store.max_connections {
        store_config = store_config.with_max_connections(max);
    }
    let store = resolve_vector_store_provider(&store_config)?;
    store.ensure_schema().await?;

    // C3: semantic cache.
    let mut cache_config = SemanticCacheProviderConfig::new(config.cache.provider.clone())
        .with_dimensions(config.embedding.dim)
        .with_default_ttl_secs(config.cache.default_ttl_secs)
        .with_default_threshold(config.cache.default_similarity_threshold);
    if let Some(url) = &config.vector_store.database_url {
        cache_config = cache_config.with_database_url(url.clone());
    }
    let cache = resolve_semantic_cache_provider(&cache_config)?;
    cache.ensure_schema().await?;

    // C4: rate limiter, with every model's declared limits registered.
    let mut limiter_config = RateLimiterProviderConfig::new(config.rate_limiter.provider.clone());
    if let Some(url) = &config.rate_limiter.redis_url {
        limiter_config = limiter_config.with_redis_url(url.clone());
    }
    let limiter = resolve_rate_limiter_provider(&limiter_config)?;

    let descriptors: Vec<ModelDescriptor> =
        config.models.iter().map(|m| m.to_descriptor()).collect();
    for descriptor in &descriptors {
        limiter
            .register_model(&descriptor.model_id, descriptor.rate_limits)
            .await?;
    }

    // Completion gateways: one per provider family named by the models.
    let mut completions: HashMap<String, Arc<dyn CompletionProvider>> = HashMap::new();
    for model in &config.models {
        if completions.contains_key(&model.provider) {
            continue;
        }
        let mut completion_config = CompletionProviderConfig::new(model.provider.clone());
        if let Some(api_key) = &model.api_key {
            completion_config = completion_config.with_api_key(api_key.clone());
        }
        if let Some(base_url) = &model.base_url {
            completion_config = completion_config.with_base_url(base_url.clone());
        }
        let provider = resolve_completion_provider(&completion_config)?;
        completions.insert(model.provider.clone(), provider);
    }

    // C5: router over the descriptors.
    let router = Arc::new(ModelRouter::new(
        descriptors,
        config.router.strategy,
        config.router.adaptive_weights.into(),
        Arc::clone(&limiter),
    ));

    // C6: the orchestrator.
    let embedding_model = ModelId::from(
        config
            .embedding
            .model
            .clone()
            .unwrap_or_else(|| config.embedding.provider.clone()),
    );
    let manager_config = ModelManagerConfig {
        embedding_model,
        per_call_timeout: Duration::from_millis(config.timeouts.per_call_ms),
        per_request_timeout: Duration::from_millis(config.timeouts.per_request_ms),
        max_retries: config.retry.max_attempts,
        initial_backoff: Duration::from_millis(config.retry.initial_backoff_ms),
        max_backoff: Duration::from_millis(config.retry.max_backoff_ms),
        cache_enabled: config.cache.enabled,
        cache_ttl: Some(Duration::from_secs(config.cache.default_ttl_secs)),
        cache_threshold: config.cache.default_similarity_threshold,
    };
    let manager = Arc::new(ModelManager::new(
        Arc::clone(&embedder),
        completions,
        Arc::clone(&store),
        Arc::clone(&cache),
        Arc::clone(&limiter),
        Arc::clone(&router),
        manager_config,
        config.cache.max_entries,
    ));

    let search = Arc::new(SemanticSearchService::new(
        Arc::clone(&embedder),
        Arc::clone(&store),
    ));

    novellus_domain::info!(
        "bootstrap",
        "runtime composed",
        &format!(
            "store = {}, cache = {}, limiter = {}, models = {}",
            store.provider_name(),
            cache.provider_name(),
            limiter.provider_name(),
            config.models.len()
        )
    );

    Ok(Runtime {
        config,
        embedder,
        store,
        cache,
        limiter,
        router,
        manager,
        search,
        metrics,
    })
}
