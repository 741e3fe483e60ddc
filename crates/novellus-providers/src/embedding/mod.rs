//! Embedding provider implementations (C1).

mod cached;
mod null;
mod ollama;
mod openai;

pub use cached::CachedEmbeddingProvider;
pub use null::NullEmbeddingProvider;
pub use ollama::OllamaEmbeddingProvider;
pub use openai::OpenAiEmbeddingProvider;
