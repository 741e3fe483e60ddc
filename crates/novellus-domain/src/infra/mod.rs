//! Domain-side seams for infrastructure concerns.

pub mod logging;
