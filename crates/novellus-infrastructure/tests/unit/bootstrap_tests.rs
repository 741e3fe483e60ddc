//! Unit tests for the composition root: registry resolution and an
//! end-to-end pass through the composed runtime on hermetic providers.

use novellus_domain::error::Error;
use novellus_domain::value_objects::{ContentKind, SearchOptions};
use novellus_infrastructure::{ConfigLoader, bootstrap};

const HERMETIC: &str = r#"
settings:
  models:
    - model_id: scripted-primary
      provider: scripted
      capabilities: [completion, chat]
      cost: { input: 0.000001, output: 0.000002 }
      priority: 10
  embedding:
    provider: "null"
    dim: 64
    batch_size: 8
  vector_store:
    provider: memory
  cache:
    provider: memory
    default_ttl_secs: 60
  rate_limiter:
    provider: local
  router:
    strategy: cost_optimized
  retry:
    max_attempts: 2
    initial_backoff_ms: 2
    max_backoff_ms: 8
"#;

#[tokio::test]
async fn bootstrap_composes_a_working_runtime() {
    let config = ConfigLoader::parse(HERMETIC).expect("parse");
    let runtime = bootstrap(config).await.expect("bootstrap");

    assert_eq!(runtime.store.provider_name(), "memory");
    assert_eq!(runtime.cache.provider_name(), "memory");
    assert_eq!(runtime.limiter.provider_name(), "local");
    assert_eq!(runtime.embedder.dimensions(), 64);

    // Ingest then search round-trips through the composed pipeline.
    let ingested = runtime
        .search
        .ingest_text("chain-1", ContentKind::LawChain, "命运链能够预见概率")
        .await
        .expect("ingest");
    assert!(ingested.inserted);

    let outcome = runtime
        .manager
        .search(
            "命运链能够预见概率",
            &SearchOptions::default().with_threshold(0.99),
        )
        .await
        .expect("search");
    assert_eq!(outcome.results.len(), 1);
    assert!((outcome.results[0].score - 1.0).abs() < 1e-6);

    // Completion flows through the scripted family and populates the cache.
    let first = runtime
        .manager
        .complete("你好", novellus_application::CompleteOptions::default())
        .await
        .expect("complete");
    assert!(!first.cached);

    let second = runtime
        .manager
        .complete("你好", novellus_application::CompleteOptions::default())
        .await
        .expect("complete again");
    assert!(second.cached);
    assert_eq!(second.content, first.content);

    // The instrumented embedder counted the gateway calls.
    assert!(runtime.metrics.snapshot().queries > 0);
}

#[tokio::test]
async fn unknown_provider_names_fail_fast() {
    let yaml = "
settings:
  models:
    - model_id: m1
      provider: nonexistent-family
  vector_store:
    provider: memory
";
    let config = ConfigLoader::parse(yaml).expect("parse");
    let err = bootstrap(config).await.unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));
    assert!(err.to_string().contains("nonexistent-family"));
}

#[tokio::test]
async fn health_report_covers_all_collaborators() {
    let config = ConfigLoader::parse(HERMETIC).expect("parse");
    let runtime = bootstrap(config).await.expect("bootstrap");

    let report = runtime.manager.health_report().await;
    assert_eq!(report.models.len(), 1);
    assert!(report.embedder_ok);
    assert!(report.store_ok);
    assert!(report.cache_ok);
}
