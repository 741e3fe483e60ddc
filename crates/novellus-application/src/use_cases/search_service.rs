//! Semantic search service
//!
//! Ingestion and the specialized search entry points: embed text once,
//! store it content-addressed, and query law-chain aspects and character
//! behavior through the same gateway.

use std::sync::Arc;

use novellus_domain::entities::{InsertOutcome, NewEmbeddingRecord};
use novellus_domain::error::Result;
use novellus_domain::ports::providers::{EmbeddingProvider, VectorStoreProvider};
use novellus_domain::value_objects::{
    BatchMatch, BehaviorPrediction, ChainMatch, ChainSearchOptions, CharacterId, ContentKind,
    ProfileAspect,
};

/// Embed-then-store / embed-then-search facade over C1 + C2.
pub struct SemanticSearchService {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
}

impl SemanticSearchService {
    /// Wire the service from its collaborators.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStoreProvider>) -> Self {
        Self { embedder, store }
    }

    /// Embed a text and insert it as a content-addressed record.
    ///
    /// Re-ingesting identical content under the same model and version
    /// returns the existing record (`inserted == false`).
    ///
    /// # Errors
    ///
    /// Propagates embedding and store errors.
    pub async fn ingest_text(
        &self,
        content_id: &str,
        content_kind: ContentKind,
        text: &str,
    ) -> Result<InsertOutcome> {
        let embedding = self.embedder.embed(text).await?;
        let record = NewEmbeddingRecord::from_text(
            content_id,
            content_kind,
            text,
            embedding.vector,
            embedding.model,
            1,
        );
        self.store.insert(record).await
    }

    /// Embed a query and search one law-chain aspect.
    ///
    /// # Errors
    ///
    /// Propagates embedding and store errors.
    pub async fn search_chains(
        &self,
        query: &str,
        options: &ChainSearchOptions,
    ) -> Result<Vec<ChainMatch>> {
        let embedding = self.embedder.embed(query).await?;
        self.store.search_law_chain(&embedding.vector, options).await
    }

    /// Embed a situation and predict analogous character behavior.
    ///
    /// # Errors
    ///
    /// Propagates embedding and store errors.
    pub async fn predict_behavior(
        &self,
        target: CharacterId,
        situation: &str,
        aspect: ProfileAspect,
        threshold: f64,
    ) -> Result<Vec<BehaviorPrediction>> {
        let embedding = self.embedder.embed(situation).await?;
        self.store
            .predict_character_behavior(target, &embedding.vector, aspect, threshold)
            .await
    }

    /// Embed many queries and run them as one batch similarity pass.
    ///
    /// # Errors
    ///
    /// Propagates embedding and store errors; `InvalidArgument` for an
    /// empty query list.
    pub async fn batch_search(
        &self,
        queries: &[String],
        threshold: f64,
        per_query_limit: usize,
    ) -> Result<Vec<BatchMatch>> {
        let embeddings = self.embedder.embed_batch(queries).await?;
        let vectors: Vec<Vec<f32>> = embeddings.into_iter().map(|e| e.vector).collect();
        self.store
            .batch_similarity(&vectors, threshold, per_query_limit)
            .await
    }
}
