//! Dependency wiring.

mod bootstrap;

pub use bootstrap::{Runtime, bootstrap};
