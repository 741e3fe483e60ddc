#![allow(missing_docs)]

use async_trait::async_trait;

use crate::error::Result;
use crate::value_objects::Embedding;

/// Text-to-vector gateway (C1).
///
/// Implementations must return one vector per input, in input order, each of
/// `dimensions()` length. Idempotent modulo provider determinism: the same
/// input may yield marginally different vectors across runs, so consumers
/// that require stability hash inputs and reuse stored vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let embeddings = self.embed_batch(&[text.to_owned()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| crate::error::Error::embedding("No embedding returned"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;
    fn dimensions(&self) -> usize;
    fn provider_name(&self) -> &str;

    async fn health_check(&self) -> Result<()> {
        self.embed("health check").await?;
        Ok(())
    }
}
