//! Domain macros organized by usage context.
//!
//! Sub-modules group macros by the domain area they serve:
//! - [`entities`]: Entity and value-object type macros
//! - [`logging`]: Log facade dispatch macros
//! - [`registry`]: Provider registry infrastructure macros

#[macro_use]
mod entities;
#[macro_use]
mod logging;
#[macro_use]
mod registry;
