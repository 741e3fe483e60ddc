//! # Infrastructure Layer
//!
//! The outermost ring: YAML configuration (types, loader, validation),
//! the tracing bridge behind the domain log facade, and the `Runtime`
//! composition root that resolves providers from the registries and wires
//! the application use cases.
#![allow(missing_docs)]

/// Configuration types, loader, and validation
pub mod config;
/// Composition root
pub mod di;
/// Tracing setup and the domain log bridge
pub mod logging;

pub use config::{AppConfig, ConfigLoader};
pub use di::{Runtime, bootstrap};
pub use logging::init_logging;
