//! External Provider Ports
//!
//! The seams of the AI-content core: embedding and completion gateways,
//! the vector store, the semantic cache, and the rate limiter. Providers
//! raise raw errors from the taxonomy in [`crate::error`]; retry and
//! failover policy belongs to the model manager, not to providers.

#![allow(missing_docs)]

mod completion;
mod embedding;
mod rate_limiter;
mod semantic_cache;
mod vector_store;

pub use completion::*;
pub use embedding::*;
pub use rate_limiter::*;
pub use semantic_cache::*;
pub use vector_store::*;
