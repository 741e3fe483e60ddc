//! In-memory semantic cache
//!
//! DashMap-backed implementation for tests and single-node development.
//! Exact-hash matches first, then a k=1 semantic probe over live entries.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use novellus_domain::entities::CacheEntry;
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::{
    CacheLookup, CachePut, CacheStats, CachedResponse, SemanticCacheProvider,
};
use novellus_domain::registry::semantic_cache::{
    SEMANTIC_CACHE_PROVIDERS, SemanticCacheProviderConfig, SemanticCacheProviderEntry,
};
use novellus_domain::utils::query_hash;
use novellus_domain::value_objects::{EntryId, cosine_score};

/// DashMap-backed semantic cache, keyed by query hash.
pub struct InMemorySemanticCache {
    dimensions: usize,
    entries: DashMap<String, CacheEntry>,
    swept: AtomicU64,
    evicted: AtomicU64,
}

impl InMemorySemanticCache {
    /// Create a cache for query embeddings of one dimension.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: DashMap::new(),
            swept: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::dimension(self.dimensions, vector.len()));
        }
        Ok(())
    }

    fn bump(entry: &mut CacheEntry) -> CachedResponse {
        let now = Utc::now();
        entry.hit_count += 1;
        entry.last_hit_at = Some(now);
        entry.updated_at = now;
        CachedResponse {
            entry_id: entry.entry_id,
            payload: entry.response_payload.clone(),
            metadata: entry.response_metadata.clone(),
        }
    }
}

#[async_trait]
impl SemanticCacheProvider for InMemorySemanticCache {
    async fn lookup(&self, query_text: &str, query_vector: &[f32]) -> Result<CacheLookup> {
        self.check_dimensions(query_vector)?;
        let now = Utc::now();
        let hash = query_hash(query_text);

        if let Some(mut entry) = self.entries.get_mut(&hash) {
            if entry.is_live(now) {
                return Ok(CacheLookup::ExactHit(Self::bump(entry.value_mut())));
            }
        }

        // k=1 semantic probe over live entries.
        let mut best: Option<(String, f64)> = None;
        for entry in self.entries.iter() {
            if !entry.is_live(now) {
                continue;
            }
            let similarity = cosine_score(query_vector, &entry.query_embedding)?;
            if best.as_ref().is_none_or(|(_, s)| similarity > *s) {
                best = Some((entry.key().clone(), similarity));
            }
        }

        if let Some((key, similarity)) = best {
            if let Some(mut entry) = self.entries.get_mut(&key) {
                if similarity >= entry.similarity_threshold {
                    let response = Self::bump(entry.value_mut());
                    return Ok(CacheLookup::SemanticHit {
                        response,
                        similarity,
                    });
                }
            }
        }
        Ok(CacheLookup::Miss)
    }

    async fn put(&self, put: CachePut) -> Result<EntryId> {
        self.check_dimensions(&put.query_vector)?;
        let now = Utc::now();
        let hash = query_hash(&put.query_text);
        let expires_at = put
            .ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| now + ttl);

        let entry_id = match self.entries.get_mut(&hash) {
            Some(mut existing) => {
                let entry = existing.value_mut();
                entry.query_embedding = put.query_vector;
                entry.response_payload = put.payload;
                entry.response_metadata = put.metadata;
                entry.similarity_threshold = put.similarity_threshold;
                entry.hit_count += 1;
                entry.expires_at = expires_at;
                entry.updated_at = now;
                entry.entry_id
            }
            None => {
                let entry = CacheEntry {
                    entry_id: EntryId::new(),
                    query_text: put.query_text,
                    query_hash: hash.clone(),
                    query_embedding: put.query_vector,
                    response_payload: put.payload,
                    response_metadata: put.metadata,
                    similarity_threshold: put.similarity_threshold,
                    hit_count: 1,
                    last_hit_at: None,
                    expires_at,
                    created_at: now,
                    updated_at: now,
                };
                let id = entry.entry_id;
                self.entries.insert(hash, entry);
                id
            }
        };
        Ok(entry_id)
    }

    async fn sweep_expired(&self, batch_limit: usize) -> Result<u64> {
        let now = Utc::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| !e.is_live(now))
            .take(batch_limit)
            .map(|e| e.key().clone())
            .collect();

        let mut deleted = 0;
        for key in expired {
            if self.entries.remove(&key).is_some() {
                deleted += 1;
            }
        }
        self.swept.fetch_add(deleted, Ordering::Relaxed);
        Ok(deleted)
    }

    async fn evict_to_capacity(&self, max_entries: usize) -> Result<u64> {
        let total = self.entries.len();
        if total <= max_entries {
            return Ok(0);
        }

        let now = Utc::now();
        // Expired first, then lowest hit count, then oldest last hit.
        let mut candidates: Vec<(String, bool, i64, Option<chrono::DateTime<Utc>>)> = self
            .entries
            .iter()
            .map(|e| {
                (
                    e.key().clone(),
                    !e.is_live(now),
                    e.hit_count,
                    e.last_hit_at,
                )
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| a.2.cmp(&b.2))
                .then_with(|| a.3.cmp(&b.3))
        });

        let mut evicted = 0;
        for (key, _, _, _) in candidates.into_iter().take(total - max_entries) {
            if self.entries.remove(&key).is_some() {
                evicted += 1;
            }
        }
        self.evicted.fetch_add(evicted, Ordering::Relaxed);
        Ok(evicted)
    }

    async fn stats(&self) -> Result<CacheStats> {
        let now = Utc::now();
        let mut entries = 0;
        let mut total_hits = 0;
        for entry in self.entries.iter() {
            if entry.is_live(now) {
                entries += 1;
                total_hits += entry.hit_count.max(0) as u64;
            }
        }
        Ok(CacheStats {
            entries,
            total_hits,
            swept: self.swept.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        })
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}

fn memory_cache_factory(
    config: &SemanticCacheProviderConfig,
) -> std::result::Result<Arc<dyn SemanticCacheProvider>, String> {
    let dimensions = config
        .dimensions
        .ok_or_else(|| "Memory semantic cache requires dimensions in config".to_owned())?;
    Ok(Arc::new(InMemorySemanticCache::new(dimensions)))
}

#[linkme::distributed_slice(SEMANTIC_CACHE_PROVIDERS)]
static MEMORY_PROVIDER: SemanticCacheProviderEntry = SemanticCacheProviderEntry {
    name: "memory",
    description: "DashMap-backed semantic cache for tests and development",
    build: memory_cache_factory,
};
