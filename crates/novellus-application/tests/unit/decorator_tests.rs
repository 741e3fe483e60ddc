//! Unit tests for the instrumented embedding decorator, with a mocked
//! inner provider.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use novellus_application::QueryMetrics;
use novellus_application::decorators::InstrumentedEmbeddingProvider;
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::EmbeddingProvider;
use novellus_domain::value_objects::Embedding;

mock! {
    Embedder {}

    #[async_trait]
    impl EmbeddingProvider for Embedder {
        async fn embed(&self, text: &str) -> Result<Embedding>;
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;
        fn dimensions(&self) -> usize;
        fn provider_name(&self) -> &str;
        async fn health_check(&self) -> Result<()>;
    }
}

#[tokio::test]
async fn successes_and_failures_are_both_counted() {
    let mut inner = MockEmbedder::new();
    inner
        .expect_embed()
        .times(1)
        .returning(|_| Ok(Embedding::new(vec![0.0; 4], "mock")));
    inner
        .expect_embed_batch()
        .times(1)
        .returning(|_| Err(Error::provider_unavailable("mock", "down")));

    let metrics = Arc::new(QueryMetrics::new());
    let instrumented =
        InstrumentedEmbeddingProvider::new(Arc::new(inner), Arc::clone(&metrics));

    instrumented.embed("text").await.expect("embed");
    instrumented
        .embed_batch(&["text".to_owned()])
        .await
        .expect_err("batch should fail");

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.queries, 2);
    assert_eq!(snapshot.failures, 1);
    assert_eq!(snapshot.cache_hits, 0);
}

#[tokio::test]
async fn dimensions_and_name_are_delegated() {
    let mut inner = MockEmbedder::new();
    inner.expect_dimensions().return_const(1536_usize);
    inner
        .expect_provider_name()
        .return_const("mock".to_owned());

    let instrumented =
        InstrumentedEmbeddingProvider::new(Arc::new(inner), Arc::new(QueryMetrics::new()));
    assert_eq!(instrumented.dimensions(), 1536);
    assert_eq!(instrumented.provider_name(), "mock");
    assert_eq!(instrumented.inner_provider_name(), "mock");
}
