//! # Domain Layer
//!
//! Core business logic and domain types for the Novellus AI-content core:
//! embedding records, semantic cache entries, model descriptors, and the
//! port interfaces the provider layer implements.
#![allow(missing_docs)]
//!
//! ## Architecture
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`entities`] | Core business entities with identity |
//! | [`value_objects`] | Immutable value objects |
//! | [`ports`] | External provider port interfaces |
//! | [`registry`] | Provider auto-registration registry |
//! | [`constants`] | Domain constants |
//! | [`error`] | Domain error taxonomy |
//!
//! ## Clean Architecture Principles
//!
//! - **Entities** are at the center with business rules
//! - **Value Objects** are immutable and compared by value
//! - **No infrastructure dependencies** - logging goes through a pluggable facade
//! - **Pure business logic** - vector math and cache policy live here, I/O does not
//!
//! ## Example
//!
//! ```
//! use novellus_domain::value_objects::{ContentKind, Embedding};
//!
//! let embedding = Embedding {
//!     vector: vec![0.1, 0.2],
//!     model: "text-embedding-ada-002".into(),
//!     dimensions: 2,
//! };
//! assert_eq!(embedding.vector.len(), embedding.dimensions);
//! assert_eq!(ContentKind::LawChain.as_str(), "law_chain");
//! ```

/// Common macros
#[macro_use]
pub mod macros;

/// Domain-level constants
pub mod constants;
/// Core business entities with identity
pub mod entities;
/// Domain error types
pub mod error;
/// Logging facade registration point
pub mod infra;
/// External provider port interfaces
pub mod ports;
/// Provider auto-registration registry
pub mod registry;
/// Common utilities
pub mod utils;
/// Immutable value objects
pub mod value_objects;

// Re-export commonly used types for convenience
pub use constants::*;
pub use entities::*;
pub use error::{Error, Result};
pub use utils::{content_hash, normalize_query};
pub use value_objects::*;
