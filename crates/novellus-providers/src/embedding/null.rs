//! Null embedding provider
//!
//! Deterministic, offline embedding source for tests and air-gapped
//! development. Vectors are derived from the SHA-256 of the input, so the
//! same text always embeds to the same unit vector, and the
//! insert-then-search round trip scores exactly 1.0.

use std::sync::Arc;

use async_trait::async_trait;
use novellus_domain::constants::embedding::DEFAULT_EMBEDDING_DIM;
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::EmbeddingProvider;
use novellus_domain::registry::embedding::{
    EMBEDDING_PROVIDERS, EmbeddingProviderConfig, EmbeddingProviderEntry,
};
use novellus_domain::value_objects::Embedding;
use sha2::{Digest, Sha256};

/// Deterministic hash-seeded embedding provider.
#[derive(Debug, Clone)]
pub struct NullEmbeddingProvider {
    dimensions: usize,
}

impl NullEmbeddingProvider {
    /// Create a provider producing vectors of the given dimension.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let digest = Sha256::digest(text.as_bytes());
        let mut state = u64::from_le_bytes(
            digest[..8]
                .try_into()
                .unwrap_or([0x9e, 0x37, 0x79, 0xb9, 0x7f, 0x4a, 0x7c, 0x15]),
        );

        // splitmix64 over the digest seed: cheap, stable, well-spread.
        let mut vector = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
            let mut z = state;
            z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
            z ^= z >> 31;
            // Map to [-1, 1].
            vector.push((z as f64 / u64::MAX as f64 * 2.0 - 1.0) as f32);
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        Embedding::new(vector, "null")
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Err(Error::invalid_argument("embed_batch requires input texts"));
        }
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "null"
    }
}

fn null_embedding_factory(
    config: &EmbeddingProviderConfig,
) -> std::result::Result<Arc<dyn EmbeddingProvider>, String> {
    let dimensions = config.dimensions.unwrap_or(DEFAULT_EMBEDDING_DIM);
    Ok(Arc::new(NullEmbeddingProvider::new(dimensions)))
}

#[linkme::distributed_slice(EMBEDDING_PROVIDERS)]
static NULL_PROVIDER: EmbeddingProviderEntry = EmbeddingProviderEntry {
    name: "null",
    description: "Deterministic hash-seeded embeddings for tests and offline use",
    build: null_embedding_factory,
};
