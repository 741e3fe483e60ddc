//! Unit tests for config parsing, defaults, and validation.

use std::io::Write;

use novellus_domain::error::Error;
use novellus_domain::value_objects::RouteStrategy;
use novellus_infrastructure::ConfigLoader;
use rstest::*;

const MINIMAL: &str = "
settings:
  models:
    - model_id: m1
      provider: scripted
";

#[test]
fn minimal_config_gets_defaults() {
    let config = ConfigLoader::parse(MINIMAL).expect("parse");
    assert_eq!(config.models.len(), 1);
    assert_eq!(config.models[0].context_window, 8192);
    assert_eq!(config.embedding.provider, "null");
    assert_eq!(config.embedding.dim, 1536);
    assert_eq!(config.vector_store.provider, "memory");
    assert_eq!(config.router.strategy, RouteStrategy::Adaptive);
    assert!(config.cache.enabled);
    assert_eq!(config.retry.max_attempts, 3);
}

#[test]
fn missing_settings_key_is_rejected() {
    let err = ConfigLoader::parse("models: []").unwrap_err();
    assert!(matches!(err, Error::ConfigMissing(_)));
}

#[rstest]
#[case(
    "settings:\n  models: []\n",
    "models"
)]
#[case(
    "settings:\n  models:\n    - model_id: m1\n      provider: scripted\n  embedding:\n    dim: 0\n",
    "embedding.dim"
)]
#[case(
    "settings:\n  models:\n    - model_id: m1\n      provider: scripted\n  cache:\n    enabled: true\n    default_ttl_secs: 0\n",
    "cache.default_ttl_secs"
)]
#[case(
    "settings:\n  models:\n    - model_id: m1\n      provider: scripted\n  cache:\n    default_similarity_threshold: 1.5\n",
    "cache.default_similarity_threshold"
)]
#[case(
    "settings:\n  models:\n    - model_id: m1\n      provider: scripted\n  vector_store:\n    provider: postgres\n",
    "vector_store.database_url"
)]
#[case(
    "settings:\n  models:\n    - model_id: m1\n      provider: scripted\n  rate_limiter:\n    provider: redis\n",
    "rate_limiter.redis_url"
)]
#[case(
    "settings:\n  models:\n    - model_id: m1\n      provider: scripted\n  retry:\n    max_attempts: 0\n",
    "retry.max_attempts"
)]
#[case(
    "settings:\n  models:\n    - model_id: m1\n      provider: scripted\n    - model_id: m1\n      provider: scripted\n",
    "models.model_id"
)]
#[case(
    "settings:\n  models:\n    - model_id: m1\n      provider: scripted\n      capabilities: [embedding]\n",
    "models.capabilities"
)]
fn invalid_configs_name_the_offending_key(#[case] yaml: &str, #[case] expected_key: &str) {
    let err = ConfigLoader::parse(yaml).unwrap_err();
    match err {
        Error::ConfigInvalid { key, .. } => assert_eq!(key, expected_key),
        other => panic!("expected ConfigInvalid for {expected_key}, got {other}"),
    }
}

#[test]
fn loader_reads_an_explicit_path() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(MINIMAL.as_bytes()).expect("write");

    let config = ConfigLoader::new()
        .with_config_path(file.path())
        .load()
        .expect("load");
    assert_eq!(config.models[0].model_id, "m1");
}

#[test]
fn loader_rejects_a_missing_explicit_path() {
    let err = ConfigLoader::new()
        .with_config_path("/definitely/not/here.yaml")
        .load()
        .unwrap_err();
    assert!(matches!(err, Error::ConfigMissing(_)));
}

#[test]
fn api_keys_are_redacted_in_debug_output() {
    let yaml = "
settings:
  models:
    - model_id: m1
      provider: openai
      api_key: sk-super-secret
  embedding:
    provider: openai
    api_key: sk-other-secret
";
    let config = ConfigLoader::parse(yaml).expect("parse");
    let rendered = format!("{config:?}");
    assert!(!rendered.contains("sk-super-secret"));
    assert!(!rendered.contains("sk-other-secret"));
    assert!(rendered.contains("REDACTED"));
}

#[test]
fn checked_in_config_files_parse() {
    for name in ["development.yaml", "test.yaml"] {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../config")
            .join(name);
        let content = std::fs::read_to_string(&path).expect("read config");
        ConfigLoader::parse(&content).unwrap_or_else(|e| panic!("{name} invalid: {e}"));
    }
}
