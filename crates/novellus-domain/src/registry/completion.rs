//! Completion Provider Registry

use std::collections::HashMap;

/// Configuration for completion provider creation
#[derive(Debug, Clone, Default)]
pub struct CompletionProviderConfig {
    /// Provider name (e.g. "openai", "ollama", "scripted")
    pub provider: String,
    /// API key for authentication
    pub api_key: Option<String>,
    /// Base URL for the provider API
    pub base_url: Option<String>,
    /// Additional provider-specific configuration
    pub extra: HashMap<String, String>,
}

crate::impl_config_builder!(CompletionProviderConfig {
    /// Set the API key
    api_key: with_api_key(into String),
    /// Set the base URL for the API
    base_url: with_base_url(into String),
});

crate::impl_registry!(
    provider_trait: crate::ports::providers::CompletionProvider,
    config_type: CompletionProviderConfig,
    entry_type: CompletionProviderEntry,
    slice_name: COMPLETION_PROVIDERS,
    resolve_fn: resolve_completion_provider,
    list_fn: list_completion_providers
);
