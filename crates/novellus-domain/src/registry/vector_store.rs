//! Vector Store Provider Registry

use std::collections::HashMap;

/// Configuration for vector store provider creation
#[derive(Debug, Clone, Default)]
pub struct VectorStoreProviderConfig {
    /// Provider name (e.g. "postgres", "memory")
    pub provider: String,
    /// Connection string for database-backed stores
    pub database_url: Option<String>,
    /// Vector dimension the store is provisioned for
    pub dimensions: Option<usize>,
    /// Connection pool ceiling
    pub max_connections: Option<u32>,
    /// Additional provider-specific configuration
    pub extra: HashMap<String, String>,
}

crate::impl_config_builder!(VectorStoreProviderConfig {
    /// Set the database connection string
    database_url: with_database_url(into String),
    /// Set the vector dimensions
    dimensions: with_dimensions(usize),
    /// Set the connection pool ceiling
    max_connections: with_max_connections(u32),
});

crate::impl_registry!(
    provider_trait: crate::ports::providers::VectorStoreProvider,
    config_type: VectorStoreProviderConfig,
    entry_type: VectorStoreProviderEntry,
    slice_name: VECTOR_STORE_PROVIDERS,
    resolve_fn: resolve_vector_store_provider,
    list_fn: list_vector_store_providers
);
