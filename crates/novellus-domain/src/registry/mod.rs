//! Provider auto-registration registries.
//!
//! Providers register themselves via `#[linkme::distributed_slice]` entries
//! and are resolved by name at bootstrap. One registry per provider family.

pub mod completion;
pub mod embedding;
pub mod rate_limiter;
pub mod semantic_cache;
pub mod vector_store;
