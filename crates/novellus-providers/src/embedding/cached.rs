//! Memoizing embedding decorator
//!
//! Wraps any `EmbeddingProvider` with a content-hash-keyed Moka cache so
//! repeated embeds of identical text (cache probes, re-ingests) skip the
//! provider round trip. This also pins down provider non-determinism: for
//! the lifetime of a cache entry, the same text maps to the same vector.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use novellus_domain::error::Result;
use novellus_domain::ports::providers::EmbeddingProvider;
use novellus_domain::utils::content_hash;
use novellus_domain::value_objects::Embedding;

/// Content-addressed memoization front for an embedding provider.
pub struct CachedEmbeddingProvider {
    inner: Arc<dyn EmbeddingProvider>,
    cache: Cache<String, Embedding>,
}

impl CachedEmbeddingProvider {
    /// Wrap a provider with a cache of at most `capacity` vectors.
    #[must_use]
    pub fn new(inner: Arc<dyn EmbeddingProvider>, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Vectors currently memoized.
    pub async fn cached_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let key = content_hash(text);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit);
        }
        let embedding = self.inner.embed(text).await?;
        self.cache.insert(key, embedding.clone()).await;
        Ok(embedding)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        // Resolve what we can from the cache; fetch the rest in one batch.
        let mut resolved: Vec<Option<Embedding>> = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();
        for text in texts {
            let key = content_hash(text);
            match self.cache.get(&key).await {
                Some(hit) => resolved.push(Some(hit)),
                None => {
                    resolved.push(None);
                    missing.push(text.clone());
                }
            }
        }

        if !missing.is_empty() {
            let fetched = self.inner.embed_batch(&missing).await?;
            let mut fetched = fetched.into_iter();
            for (slot, text) in resolved.iter_mut().zip(texts.iter()) {
                if slot.is_none() {
                    if let Some(embedding) = fetched.next() {
                        self.cache
                            .insert(content_hash(text), embedding.clone())
                            .await;
                        *slot = Some(embedding);
                    }
                }
            }
        }

        Ok(resolved.into_iter().flatten().collect())
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use novellus_domain::error::Error;

    use super::*;

    struct CountingProvider {
        calls: AtomicU64,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if texts.is_empty() {
                return Err(Error::invalid_argument("empty"));
            }
            Ok(texts
                .iter()
                .map(|_| Embedding::new(vec![1.0, 0.0], "counting"))
                .collect())
        }

        fn dimensions(&self) -> usize {
            2
        }

        fn provider_name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test]
    async fn repeated_embeds_hit_the_cache() {
        let inner = Arc::new(CountingProvider {
            calls: AtomicU64::new(0),
        });
        let cached =
            CachedEmbeddingProvider::new(Arc::clone(&inner) as Arc<dyn EmbeddingProvider>, 100);

        cached.embed("same text").await.unwrap();
        cached.embed("same text").await.unwrap();
        cached.embed("same text").await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cached.cached_count().await, 1);
    }

    #[tokio::test]
    async fn batch_fetches_only_missing_texts() {
        let inner = Arc::new(CountingProvider {
            calls: AtomicU64::new(0),
        });
        let cached =
            CachedEmbeddingProvider::new(Arc::clone(&inner) as Arc<dyn EmbeddingProvider>, 100);

        cached.embed("a").await.unwrap();
        let out = cached
            .embed_batch(&["a".to_owned(), "b".to_owned()])
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        // One call for "a", one batch call for the missing "b".
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
