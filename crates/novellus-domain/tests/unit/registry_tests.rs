//! Unit tests for the provider registries

use novellus_domain::registry::embedding::{
    EmbeddingProviderConfig, list_embedding_providers, resolve_embedding_provider,
};

#[test]
fn unknown_provider_resolution_fails_with_available_list() {
    // The domain crate registers no providers itself.
    let config = EmbeddingProviderConfig::new("does-not-exist");
    let err = match resolve_embedding_provider(&config) {
        Err(e) => e,
        Ok(_) => panic!("expected resolve_embedding_provider to fail for unknown provider"),
    };
    assert!(err.to_string().contains("does-not-exist"));
}

#[test]
fn config_builder_sets_fields() {
    let config = EmbeddingProviderConfig::new("openai")
        .with_model("text-embedding-ada-002")
        .with_dimensions(1536)
        .with_batch_size(32)
        .with_extra("organization", "novellus");
    assert_eq!(config.provider, "openai");
    assert_eq!(config.model.as_deref(), Some("text-embedding-ada-002"));
    assert_eq!(config.dimensions, Some(1536));
    assert_eq!(config.batch_size, Some(32));
    assert_eq!(
        config.extra.get("organization").map(String::as_str),
        Some("novellus")
    );
    // No providers registered in the domain crate itself.
    let _ = list_embedding_providers();
}
