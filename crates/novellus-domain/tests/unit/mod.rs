//! Unit test aggregator for the domain crate.

mod content_kind_tests;
mod embedding_tests;
mod ids_tests;
mod registry_tests;
