//! # Provider Layer
//!
//! Concrete implementations of the domain's provider ports:
//!
//! | Family | Providers |
//! |--------|-----------|
//! | [`embedding`] | `openai`, `ollama`, `null`, plus a memoizing decorator |
//! | [`completion`] | `openai`, `ollama`, `scripted` |
//! | [`vector_store`] | `postgres` (pgvector), `memory` |
//! | [`semantic_cache`] | `postgres` (pgvector), `memory` |
//! | [`rate_limit`] | `local` (token buckets), `redis` |
//!
//! Every provider registers itself in the matching
//! [`novellus_domain::registry`] distributed slice and is resolved by name
//! at bootstrap.

/// Completion (LLM) providers
pub mod completion;
/// Embedding providers
pub mod embedding;
/// Rate limiter providers
pub mod rate_limit;
/// Semantic cache providers
pub mod semantic_cache;
/// Vector store providers
pub mod vector_store;
