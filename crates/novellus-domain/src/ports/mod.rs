//! Port interfaces the outer layers implement or consume.

mod logging;
pub mod providers;

pub use logging::*;
pub use providers::*;
