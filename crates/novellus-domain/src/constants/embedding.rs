//! Embedding gateway defaults.

/// Default embedding dimension (OpenAI ada-002 / 3-small family).
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Default model name for the embedding gateway.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Texts per provider call when batching.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 32;
