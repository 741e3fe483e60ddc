#![allow(missing_docs)]

use async_trait::async_trait;

use crate::entities::{CharacterProfile, InsertOutcome, LawChainProfile, NewEmbeddingRecord};
use crate::error::Result;
use crate::value_objects::{
    BatchMatch, BehaviorPrediction, ChainMatch, ChainSearchOptions, CharacterId, ProfileAspect,
    ScoredRecord, SearchLogSummary, SearchOptions, StoreStats,
};

/// Vector persistence and similarity search (C2).
///
/// Contract highlights, shared by every implementation:
/// - dimension mismatches fail with `Error::Dimension` before any write;
/// - an empty table returns an empty list on every read path, never an error;
/// - rows with NULL vectors are excluded from similarity queries;
/// - reads retry once on transient backend errors, writes never auto-retry;
/// - results order by score desc (cosine) / distance asc (L2), ties broken
///   by `created_at` desc then record id asc.
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Create relations and indices if missing. Idempotent.
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert a record, enforcing uniqueness on
    /// `(content_hash, model_name, embedding_version)`. A collision returns
    /// the existing row unchanged.
    async fn insert(&self, record: NewEmbeddingRecord) -> Result<InsertOutcome>;

    /// Ranked filtered k-NN over the primary relation.
    async fn search_similar(
        &self,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredRecord>>;

    /// Ranked k-NN over one law-chain aspect column. Per-row threshold
    /// overrides are merged with the caller's by `max`.
    async fn search_law_chain(
        &self,
        query_vector: &[f32],
        options: &ChainSearchOptions,
    ) -> Result<Vec<ChainMatch>>;

    /// Find characters whose aspect profile resembles the situation,
    /// excluding the target character itself. Scores are bucketed into
    /// confidence values.
    async fn predict_character_behavior(
        &self,
        target: CharacterId,
        situation_vector: &[f32],
        aspect: ProfileAspect,
        threshold: f64,
    ) -> Result<Vec<BehaviorPrediction>>;

    /// Cosine k-NN for many queries at once. Results preserve order by
    /// `query_index`, then by rank within each query.
    async fn batch_similarity(
        &self,
        query_vectors: &[Vec<f32>],
        threshold: f64,
        per_query_limit: usize,
    ) -> Result<Vec<BatchMatch>>;

    /// Upsert a law chain profile row (keyed by chain id).
    async fn upsert_law_chain(&self, profile: LawChainProfile) -> Result<()>;

    /// Upsert a character profile row (keyed by character id).
    async fn upsert_character_profile(&self, profile: CharacterProfile) -> Result<()>;

    /// Rebuild ANN indices whose backing table changed by >= 2x since the
    /// last build, with `lists` recomputed from the current row count.
    /// Returns whether any index was rebuilt. A rebuild failure leaves the
    /// previous index intact.
    async fn reindex_if_grown(&self) -> Result<bool>;

    /// Row counts across the store's relations.
    async fn stats(&self) -> Result<StoreStats>;

    /// Aggregated execution timings from the append-only search log.
    async fn search_log_summary(&self) -> Result<Vec<SearchLogSummary>>;

    /// Dimension this store is provisioned for.
    fn dimensions(&self) -> usize;

    fn provider_name(&self) -> &str;

    async fn health_check(&self) -> Result<()> {
        self.stats().await?;
        Ok(())
    }
}
