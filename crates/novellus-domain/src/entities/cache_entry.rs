//! Semantic cache entry entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::EntryId;

/// One cached LLM response, keyed by query hash and matched by similarity.
///
/// `query_hash` is unique. After creation an entry is only mutated to bump
/// `hit_count`/`last_hit_at` (or refreshed wholesale by an idempotent `put`
/// on the same hash); it is destroyed by expiry sweep or eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Entry identity
    pub entry_id: EntryId,
    /// Original query text
    pub query_text: String,
    /// SHA-256 hex digest of the normalized query
    pub query_hash: String,
    /// Embedding of the query, for semantic matching
    pub query_embedding: Vec<f32>,
    /// Cached response payload
    pub response_payload: serde_json::Value,
    /// Response metadata (model used, token counts, ...)
    pub response_metadata: serde_json::Value,
    /// Minimum similarity for this entry to answer a non-identical query
    pub similarity_threshold: f64,
    /// Times this entry answered a lookup; never negative
    pub hit_count: i64,
    /// Last lookup this entry answered
    pub last_hit_at: Option<DateTime<Utc>>,
    /// Absolute expiry; `None` means no TTL
    pub expires_at: Option<DateTime<Utc>>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Whether this entry may still answer lookups at `now`.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires| expires > now)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn entry(expires_at: Option<DateTime<Utc>>) -> CacheEntry {
        let now = Utc::now();
        CacheEntry {
            entry_id: EntryId::new(),
            query_text: "q".to_owned(),
            query_hash: "h".to_owned(),
            query_embedding: vec![0.0; 4],
            response_payload: serde_json::json!({"content": "r"}),
            response_metadata: serde_json::json!({}),
            similarity_threshold: 0.85,
            hit_count: 1,
            last_hit_at: None,
            expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn entry_without_ttl_is_live() {
        assert!(entry(None).is_live(Utc::now()));
    }

    #[test]
    fn entry_is_live_until_expiry() {
        let now = Utc::now();
        let e = entry(Some(now + Duration::seconds(60)));
        assert!(e.is_live(now));
        assert!(!e.is_live(now + Duration::seconds(61)));
    }
}
