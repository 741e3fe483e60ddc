//! Unit test aggregator for the provider crate.

mod memory_store_tests;
mod rate_limit_tests;
mod semantic_cache_tests;
