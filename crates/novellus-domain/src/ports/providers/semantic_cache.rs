#![allow(missing_docs)]

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::value_objects::EntryId;

/// A cached response handed back on a hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Entry that answered the lookup
    pub entry_id: EntryId,
    /// Cached response payload
    pub payload: serde_json::Value,
    /// Response metadata stored alongside the payload
    pub metadata: serde_json::Value,
}

/// Outcome of a cache probe.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    /// The normalized query hashed to an existing live entry
    ExactHit(CachedResponse),
    /// A live entry was similar enough to answer this query
    SemanticHit {
        response: CachedResponse,
        similarity: f64,
    },
    /// No live entry qualified
    Miss,
}

impl CacheLookup {
    /// Whether this lookup produced a response.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        !matches!(self, Self::Miss)
    }
}

/// Payload for writing a cache entry after a successful LLM response.
#[derive(Debug, Clone)]
pub struct CachePut {
    /// Original query text (hashed after normalization)
    pub query_text: String,
    /// Embedding of the query
    pub query_vector: Vec<f32>,
    /// Response payload to cache
    pub payload: serde_json::Value,
    /// Response metadata to store alongside
    pub metadata: serde_json::Value,
    /// Entry lifetime; `None` means no TTL
    pub ttl: Option<Duration>,
    /// Minimum similarity for this entry to answer a non-identical query
    pub similarity_threshold: f64,
}

/// Aggregate counters for cache observability.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live entries currently stored
    pub entries: u64,
    /// Total hits recorded across live entries
    pub total_hits: u64,
    /// Entries removed by expiry sweeps since start
    pub swept: u64,
    /// Entries removed by capacity eviction since start
    pub evicted: u64,
}

/// Vector-similarity-matched response cache (C3).
///
/// Lookup policy: exact hash of the normalized query first, then a k=1
/// semantic probe against live entries gated by each entry's own
/// threshold. `put` is idempotent on the query hash, so concurrent misses
/// that both call the provider converge to a single live entry.
#[async_trait]
pub trait SemanticCacheProvider: Send + Sync {
    /// Create backing relations if missing. Idempotent; default no-op for
    /// stores without external schema.
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn lookup(&self, query_text: &str, query_vector: &[f32]) -> Result<CacheLookup>;

    async fn put(&self, put: CachePut) -> Result<EntryId>;

    /// Delete expired entries, at most `batch_limit` per call.
    /// Returns the number deleted.
    async fn sweep_expired(&self, batch_limit: usize) -> Result<u64>;

    /// Evict down to `max_entries`: expired first, then lowest hit count,
    /// then oldest last hit. Returns the number evicted.
    async fn evict_to_capacity(&self, max_entries: usize) -> Result<u64>;

    async fn stats(&self) -> Result<CacheStats>;

    fn provider_name(&self) -> &str;
}
