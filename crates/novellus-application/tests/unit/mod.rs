//! Unit test aggregator for the application crate.

mod decorator_tests;
mod model_manager_tests;
mod router_tests;

pub(crate) mod support;
