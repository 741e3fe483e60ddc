//! Instrumented Embedding Provider Decorator
//!
//! Wraps an `EmbeddingProvider` to record timing metrics for all
//! operations. Adds metrics without modifying providers.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use delegate::delegate;
use novellus_domain::error::Result;
use novellus_domain::ports::providers::EmbeddingProvider;
use novellus_domain::value_objects::Embedding;

use crate::metrics::QueryMetrics;

/// Instrumented embedding provider decorator
///
/// Wraps any `EmbeddingProvider` to add timing metrics collection.
/// All operations are delegated to the inner provider after recording
/// metrics.
pub struct InstrumentedEmbeddingProvider {
    /// The wrapped provider
    inner: Arc<dyn EmbeddingProvider>,
    /// Metrics collector
    metrics: Arc<QueryMetrics>,
}

impl InstrumentedEmbeddingProvider {
    /// Create a new instrumented embedding provider
    pub fn new(inner: Arc<dyn EmbeddingProvider>, metrics: Arc<QueryMetrics>) -> Self {
        Self { inner, metrics }
    }

    /// Get the wrapped provider name for logging/debugging
    #[must_use]
    pub fn inner_provider_name(&self) -> &str {
        self.inner.provider_name()
    }
}

#[async_trait]
impl EmbeddingProvider for InstrumentedEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let start = Instant::now();
        let result = self.inner.embed(text).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        // Embeds never hit a response cache themselves.
        self.metrics.record_query(duration_ms, result.is_ok(), false);

        result
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let start = Instant::now();
        let result = self.inner.embed_batch(texts).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        self.metrics.record_query(duration_ms, result.is_ok(), false);

        result
    }

    delegate! {
        to self.inner {
            fn dimensions(&self) -> usize;
            fn provider_name(&self) -> &str;
        }
    }
}
