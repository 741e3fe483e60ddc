//! Model Manager (C6)
//!
//! The central orchestrator composing the embedding gateway, vector store,
//! semantic cache, rate limiter, and router to serve `embed`, `complete`,
//! and `search`.
//!
//! `complete` runs an explicit state loop per attempt:
//! `CacheLookup → Select → Admit → Call → Record`, with retryable failures
//! marking the model tried and looping back to Select, and admission
//! droughts waiting out a bounded exponential backoff. Cancellation is
//! checked between every transition; an in-flight call that completes
//! despite cancellation is discarded, but its token counters are still
//! reconciled.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use novellus_domain::constants::cache::{
    DEFAULT_CACHE_SIMILARITY_THRESHOLD, DEFAULT_CACHE_TTL_SECS, DEFAULT_SWEEP_BATCH,
};
use novellus_domain::constants::routing::{
    DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS, DEFAULT_MAX_RETRIES,
    DEFAULT_PER_CALL_TIMEOUT_MS, DEFAULT_PER_REQUEST_TIMEOUT_MS, TOKEN_ESTIMATE_CHARS_PER_TOKEN,
};
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::{
    Admission, CacheLookup, CachePut, CompletionProvider, EmbeddingProvider, RateLimiterProvider,
    SemanticCacheProvider, VectorStoreProvider,
};
use novellus_domain::value_objects::{
    Capability, CompletionOutcome, CompletionRequest, EmbedOutcome, ModelId, ScoredRecord,
    SearchOptions, SearchOutcome, TokenUsage,
};
use tokio_util::sync::CancellationToken;

use crate::routing::ModelRouter;

/// Cooldown applied when reconciliation reports an overdrawn window.
const OVERDRAW_COOLDOWN: Duration = Duration::from_secs(60);

/// Tunables for the manager, sourced from configuration.
#[derive(Debug, Clone)]
pub struct ModelManagerConfig {
    /// Model id reported for embedding operations
    pub embedding_model: ModelId,
    /// Per-provider-call timeout
    pub per_call_timeout: Duration,
    /// Whole-request timeout (callers may tighten per call)
    pub per_request_timeout: Duration,
    /// Attempts per `complete` before `AllModelsExhausted`
    pub max_retries: u32,
    /// First admission-wait backoff
    pub initial_backoff: Duration,
    /// Admission-wait backoff ceiling
    pub max_backoff: Duration,
    /// Whether the semantic cache participates by default
    pub cache_enabled: bool,
    /// TTL written with new cache entries
    pub cache_ttl: Option<Duration>,
    /// Similarity threshold written with new cache entries
    pub cache_threshold: f64,
}

impl Default for ModelManagerConfig {
    fn default() -> Self {
        Self {
            embedding_model: ModelId::from("embedding"),
            per_call_timeout: Duration::from_millis(DEFAULT_PER_CALL_TIMEOUT_MS),
            per_request_timeout: Duration::from_millis(DEFAULT_PER_REQUEST_TIMEOUT_MS),
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            cache_enabled: true,
            cache_ttl: Some(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            cache_threshold: DEFAULT_CACHE_SIMILARITY_THRESHOLD,
        }
    }
}

/// Per-call options for [`ModelManager::complete`].
#[derive(Debug, Clone)]
pub struct CompleteOptions {
    /// Probe and populate the semantic cache
    pub use_cache: bool,
    /// Attempt budget override; `None` uses the configured default
    pub max_retries: Option<u32>,
    /// Hard deadline override for the whole request
    pub deadline: Option<Duration>,
    /// Preferred model, honored when eligible and admissible
    pub model_hint: Option<ModelId>,
    /// Output token cap forwarded to the provider
    pub max_tokens: Option<u32>,
    /// Sampling temperature forwarded to the provider
    pub temperature: Option<f32>,
    /// Cooperative cancellation; checked between state transitions
    pub cancel: CancellationToken,
}

impl Default for CompleteOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            max_retries: None,
            deadline: None,
            model_hint: None,
            max_tokens: None,
            temperature: None,
            cancel: CancellationToken::new(),
        }
    }
}

/// Liveness snapshot across the manager's collaborators.
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Every configured model with live health estimates
    pub models: Vec<novellus_domain::entities::ModelDescriptor>,
    /// Embedding gateway reachable
    pub embedder_ok: bool,
    /// Vector store reachable
    pub store_ok: bool,
    /// Semantic cache reachable
    pub cache_ok: bool,
}

/// Result of one admin maintenance sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaintenanceReport {
    /// Expired cache entries deleted
    pub cache_swept: u64,
    /// Cache entries evicted for capacity
    pub cache_evicted: u64,
    /// Whether any ANN index was rebuilt
    pub reindexed: bool,
}

/// The orchestrator (C6).
pub struct ModelManager {
    embedder: Arc<dyn EmbeddingProvider>,
    completions: HashMap<String, Arc<dyn CompletionProvider>>,
    store: Arc<dyn VectorStoreProvider>,
    cache: Arc<dyn SemanticCacheProvider>,
    limiter: Arc<dyn RateLimiterProvider>,
    router: Arc<ModelRouter>,
    config: ModelManagerConfig,
    cache_capacity: usize,
}

impl ModelManager {
    /// Wire the manager from its collaborators.
    ///
    /// `completions` maps provider family names (as found in model
    /// descriptors) to provider instances.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        completions: HashMap<String, Arc<dyn CompletionProvider>>,
        store: Arc<dyn VectorStoreProvider>,
        cache: Arc<dyn SemanticCacheProvider>,
        limiter: Arc<dyn RateLimiterProvider>,
        router: Arc<ModelRouter>,
        config: ModelManagerConfig,
        cache_capacity: usize,
    ) -> Self {
        Self {
            embedder,
            completions,
            store,
            cache,
            limiter,
            router,
            config,
            cache_capacity,
        }
    }

    /// Router handle (health reports, strategy inspection).
    #[must_use]
    pub fn router(&self) -> &Arc<ModelRouter> {
        &self.router
    }

    /// Estimate the token charge for a prompt before the call. Reconciled
    /// with provider-reported actuals afterwards.
    fn estimate_tokens(prompt: &str) -> u64 {
        (prompt.len() as u64).div_ceil(TOKEN_ESTIMATE_CHARS_PER_TOKEN as u64)
    }

    /// Embed texts through the gateway.
    ///
    /// # Errors
    ///
    /// Propagates gateway errors; `InvalidArgument` for an empty input.
    pub async fn embed(&self, texts: &[String]) -> Result<EmbedOutcome> {
        let started = Instant::now();
        let vectors = self.embedder.embed_batch(texts).await?;
        Ok(EmbedOutcome {
            vectors,
            model_used: self.config.embedding_model.clone(),
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Embed the query and run a filtered similarity search.
    ///
    /// # Errors
    ///
    /// Propagates embedding and store errors.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchOutcome> {
        let started = Instant::now();
        let embedding = self.embedder.embed(query).await?;
        let results: Vec<ScoredRecord> =
            self.store.search_similar(&embedding.vector, options).await?;
        Ok(SearchOutcome {
            results,
            model_used: self.config.embedding_model.clone(),
            latency_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Serve one completion through the cache → select → admit → call →
    /// record loop.
    ///
    /// # Errors
    ///
    /// Terminal errors per the taxonomy: `InvalidRequest` for an empty
    /// prompt, `Cancelled`, `Timeout` (request scope), `NoEligibleModel`
    /// when admission never opens within the backoff ceiling, and
    /// `AllModelsExhausted` when the attempt budget is consumed.
    pub async fn complete(
        &self,
        prompt: &str,
        options: CompleteOptions,
    ) -> Result<CompletionOutcome> {
        if prompt.trim().is_empty() {
            return Err(Error::invalid_request("prompt must not be empty"));
        }

        let started = Instant::now();
        let deadline = options.deadline.unwrap_or(self.config.per_request_timeout);
        let max_retries = options.max_retries.unwrap_or(self.config.max_retries).max(1);
        let use_cache = options.use_cache && self.config.cache_enabled;
        let cancel = options.cancel.clone();

        // CacheLookup: embed once, reuse the vector for the later put.
        let query_vector = if use_cache {
            let embedding = self.embedder.embed(prompt).await?;
            match self.cache.lookup(prompt, &embedding.vector).await {
                Ok(CacheLookup::ExactHit(hit)) | Ok(CacheLookup::SemanticHit { response: hit, .. }) => {
                    return Ok(CompletionOutcome {
                        content: hit
                            .payload
                            .get("content")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_owned(),
                        model_used: None,
                        tokens_used: None,
                        cached: true,
                        latency_ms: started.elapsed().as_millis() as u64,
                    });
                }
                Ok(CacheLookup::Miss) => Some(embedding.vector),
                Err(e) => {
                    // A broken cache degrades to a miss, never to a failure.
                    novellus_domain::warn!("model_manager", "cache lookup failed", &e);
                    Some(embedding.vector)
                }
            }
        } else {
            None
        };

        let estimated_tokens = Self::estimate_tokens(prompt);
        let mut tried: Vec<ModelId> = Vec::new();
        let mut tried_set: HashSet<ModelId> = HashSet::new();
        let mut last_error: Option<Error> = None;
        let mut attempts: u32 = 0;
        let mut backoff = self.config.initial_backoff;
        let mut waited_at_ceiling = false;

        while attempts < max_retries {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let elapsed = started.elapsed();
            if elapsed >= deadline {
                return Err(Error::Timeout {
                    scope: "request",
                    elapsed_ms: elapsed.as_millis() as u64,
                });
            }

            // Select.
            let Some(model) = self
                .router
                .select(
                    Capability::Completion,
                    options.model_hint.as_ref(),
                    &tried_set,
                    estimated_tokens,
                )
                .await
            else {
                if !tried_set.is_empty() {
                    // Every candidate was tried and failed; spend no more
                    // wall clock waiting for admission.
                    break;
                }
                if waited_at_ceiling {
                    return Err(Error::NoEligibleModel {
                        capability: Capability::Completion.to_string(),
                    });
                }
                let remaining = deadline.saturating_sub(started.elapsed());
                let wait = backoff.min(remaining);
                tokio::select! {
                    () = cancel.cancelled() => return Err(Error::Cancelled),
                    () = tokio::time::sleep(wait) => {}
                }
                if backoff >= self.config.max_backoff {
                    waited_at_ceiling = true;
                }
                backoff = (backoff * 2).min(self.config.max_backoff);
                continue;
            };

            // Admit.
            match self.limiter.try_acquire(&model, estimated_tokens).await {
                Ok(Admission::Admitted) => {}
                Ok(Admission::Denied { retry_at }) => {
                    novellus_domain::debug!(
                        "model_manager",
                        "admission denied",
                        &format!("model = {model}, retry_at = {retry_at}")
                    );
                    last_error = Some(Error::rate_limited(model.as_str(), None));
                    Self::mark_tried(&mut tried, &mut tried_set, model);
                    continue;
                }
                Err(e) => {
                    last_error = Some(e);
                    Self::mark_tried(&mut tried, &mut tried_set, model);
                    continue;
                }
            }
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            // Call.
            let descriptor = self
                .router
                .descriptor(&model)
                .ok_or_else(|| Error::unknown_model(model.as_str()))?;
            let provider = self.completions.get(&descriptor.provider).ok_or_else(|| {
                Error::configuration(format!(
                    "no completion provider wired for family '{}'",
                    descriptor.provider
                ))
            })?;
            let per_call = descriptor
                .timeout_ms
                .map_or(self.config.per_call_timeout, Duration::from_millis);
            let call_timeout = per_call.min(deadline.saturating_sub(started.elapsed()));
            let request = CompletionRequest {
                model: model.clone(),
                prompt: prompt.to_owned(),
                max_tokens: options.max_tokens,
                temperature: options.temperature,
            };

            attempts += 1;
            let call_started = Instant::now();
            let call_result = tokio::select! {
                () = cancel.cancelled() => return Err(Error::Cancelled),
                result = tokio::time::timeout(call_timeout, provider.complete(&request)) => result,
            };

            match call_result {
                Ok(Ok(response)) => {
                    // Record: reconcile actuals, update health, populate
                    // the cache, then honor a late cancellation by
                    // discarding the response (counters already charged).
                    let latency = call_started.elapsed();
                    let actual_tokens = response.usage.total().max(estimated_tokens);
                    match self
                        .limiter
                        .reconcile(&model, estimated_tokens, actual_tokens)
                        .await
                    {
                        Ok(usage) if usage.overdrawn => {
                            self.router.mark_degraded_for(&model, OVERDRAW_COOLDOWN);
                        }
                        Ok(_) => {}
                        Err(e) => {
                            novellus_domain::warn!("model_manager", "reconcile failed", &e);
                        }
                    }
                    self.router.record_outcome(&model, latency, true);

                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }

                    if let Some(query_vector) = query_vector {
                        let put = CachePut {
                            query_text: prompt.to_owned(),
                            query_vector,
                            payload: serde_json::json!({"content": response.content}),
                            metadata: serde_json::json!({
                                "model": model.as_str(),
                                "prompt_tokens": response.usage.prompt_tokens,
                                "completion_tokens": response.usage.completion_tokens,
                            }),
                            ttl: self.config.cache_ttl,
                            similarity_threshold: self.config.cache_threshold,
                        };
                        if let Err(e) = self.cache.put(put).await {
                            novellus_domain::warn!("model_manager", "cache put failed", &e);
                        }
                    }

                    return Ok(CompletionOutcome {
                        content: response.content,
                        model_used: Some(model),
                        tokens_used: Some(TokenUsage {
                            prompt_tokens: response.usage.prompt_tokens,
                            completion_tokens: response.usage.completion_tokens,
                        }),
                        cached: false,
                        latency_ms: started.elapsed().as_millis() as u64,
                    });
                }
                Ok(Err(e)) => {
                    self.router
                        .record_outcome(&model, call_started.elapsed(), false);
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    novellus_domain::warn!(
                        "model_manager",
                        "attempt failed, failing over",
                        &format!("model = {model}, error = {e}")
                    );
                    last_error = Some(e);
                    Self::mark_tried(&mut tried, &mut tried_set, model);
                }
                Err(_elapsed) => {
                    self.router
                        .record_outcome(&model, call_timeout, false);
                    last_error = Some(Error::Timeout {
                        scope: "call",
                        elapsed_ms: call_timeout.as_millis() as u64,
                    });
                    Self::mark_tried(&mut tried, &mut tried_set, model);
                }
            }
        }

        let tried_names: Vec<String> = tried.iter().map(|m| m.as_str().to_owned()).collect();
        Err(Error::AllModelsExhausted {
            attempts,
            tried: tried_names,
            last: Box::new(last_error.unwrap_or(Error::NoEligibleModel {
                capability: Capability::Completion.to_string(),
            })),
        })
    }

    fn mark_tried(tried: &mut Vec<ModelId>, tried_set: &mut HashSet<ModelId>, model: ModelId) {
        if tried_set.insert(model.clone()) {
            tried.push(model);
        }
    }

    /// Admin sweep: expire cache entries, enforce cache capacity, rebuild
    /// grown ANN indices.
    ///
    /// # Errors
    ///
    /// Propagates cache and store errors.
    pub async fn run_maintenance(&self) -> Result<MaintenanceReport> {
        let cache_swept = self.cache.sweep_expired(DEFAULT_SWEEP_BATCH).await?;
        let cache_evicted = self.cache.evict_to_capacity(self.cache_capacity).await?;
        let reindexed = self.store.reindex_if_grown().await?;
        Ok(MaintenanceReport {
            cache_swept,
            cache_evicted,
            reindexed,
        })
    }

    /// Liveness snapshot across collaborators.
    pub async fn health_report(&self) -> HealthReport {
        HealthReport {
            models: self.router.health_report(),
            embedder_ok: self.embedder.health_check().await.is_ok(),
            store_ok: self.store.health_check().await.is_ok(),
            cache_ok: self.cache.stats().await.is_ok(),
        }
    }
}
