//! Search option and result value objects for the vector store surface.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::search::{DEFAULT_SEARCH_LIMIT, DEFAULT_SIMILARITY_THRESHOLD};
use crate::value_objects::ids::{ChainId, CharacterId, NovelId, RecordId};
use crate::value_objects::types::{ChainAspect, ContentKind, Metric, ProfileAspect, SearchType};

/// Options for a plain similarity search over content embeddings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Distance metric
    pub metric: Metric,
    /// Minimum score (cosine) or maximum distance (L2) for a row to qualify
    pub threshold: f64,
    /// Maximum number of rows returned
    pub limit: usize,
    /// Restrict to one content kind
    pub content_kind: Option<ContentKind>,
    /// Restrict to one novel
    pub novel_id: Option<NovelId>,
    /// Exact-match filters applied to `content_metadata` top-level keys
    pub metadata_filters: HashMap<String, serde_json::Value>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            metric: Metric::Cosine,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            limit: DEFAULT_SEARCH_LIMIT,
            content_kind: None,
            novel_id: None,
            metadata_filters: HashMap::new(),
        }
    }
}

impl SearchOptions {
    /// Set the distance metric
    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Set the qualification threshold
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the result limit
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Restrict results to one content kind
    #[must_use]
    pub fn with_content_kind(mut self, kind: ContentKind) -> Self {
        self.content_kind = Some(kind);
        self
    }

    /// Restrict results to one novel
    #[must_use]
    pub fn with_novel(mut self, novel_id: NovelId) -> Self {
        self.novel_id = Some(novel_id);
        self
    }

    /// Add an exact-match metadata filter
    #[must_use]
    pub fn with_metadata_filter(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.metadata_filters.insert(key.into(), value);
        self
    }
}

/// Options for a law-chain aspect search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSearchOptions {
    /// Which chain vector to search against
    pub aspect: ChainAspect,
    /// Caller-supplied minimum score; per-row overrides can only raise it
    pub threshold: f64,
    /// Maximum number of rows returned
    pub limit: usize,
    /// Restrict to one novel
    pub novel_id: Option<NovelId>,
}

impl ChainSearchOptions {
    /// Create options for an aspect with defaults for the rest.
    pub fn new(aspect: ChainAspect) -> Self {
        Self {
            aspect,
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
            limit: DEFAULT_SEARCH_LIMIT,
            novel_id: None,
        }
    }

    /// Set the qualification threshold
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the result limit
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Restrict results to one novel
    #[must_use]
    pub fn with_novel(mut self, novel_id: NovelId) -> Self {
        self.novel_id = Some(novel_id);
        self
    }
}

/// One ranked row from a similarity search.
///
/// Rows are ordered by score (descending for cosine, ascending distance for
/// L2), ties broken by `created_at` descending then `record_id` ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredRecord {
    /// Record identity
    pub record_id: RecordId,
    /// Similarity score (cosine, clamped [0,1]) or raw L2 distance
    pub score: f64,
    /// Caller-supplied content identifier
    pub content_id: String,
    /// Content kind of the matched record
    pub content_kind: ContentKind,
    /// Stored source text, when retained
    pub content_text: Option<String>,
    /// Stored metadata payload
    pub metadata: serde_json::Value,
    /// Row creation time (tie-break key)
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One ranked law chain from an aspect search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainMatch {
    /// Chain identity
    pub chain_id: ChainId,
    /// Chain display name
    pub chain_name: String,
    /// Owning novel, when scoped
    pub novel_id: Option<NovelId>,
    /// Aspect that was searched
    pub aspect: ChainAspect,
    /// Cosine score against the aspect vector
    pub score: f64,
    /// Chain tags
    pub tags: Vec<String>,
}

/// One predicted behavior analogue for a character situation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorPrediction {
    /// Character whose profile matched (never the target character)
    pub character_id: CharacterId,
    /// Character display name
    pub character_name: String,
    /// Profile aspect that was searched
    pub aspect: ProfileAspect,
    /// Raw cosine score
    pub score: f64,
    /// Bucketed confidence derived from the score
    pub confidence: f64,
}

/// One ranked row from a batch similarity query.
///
/// Results preserve `query_index` order, then rank within each query.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BatchMatch {
    /// Index of the originating query vector
    pub query_index: usize,
    /// Matched record
    pub record_id: RecordId,
    /// Cosine score
    pub score: f64,
}

/// Row counts reported by a vector store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Rows in the primary embedding relation
    pub record_count: u64,
    /// Law chain profiles
    pub chain_count: u64,
    /// Character profiles
    pub character_count: u64,
    /// Append-only search log entries
    pub search_log_count: u64,
}

/// Aggregated execution timings for one search type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchLogSummary {
    /// Search type the row aggregates
    pub search_type: SearchType,
    /// Number of logged searches
    pub count: u64,
    /// Mean execution time in milliseconds
    pub avg_execution_ms: f64,
    /// 95th percentile execution time in milliseconds
    pub p95_execution_ms: f64,
}
