//! Configuration
//!
//! Loaded once at startup into an [`AppConfig`] value and passed by reference
//! to whatever needs it. There is no process-wide configuration state.

mod structs;
pub mod validators;

pub use structs::*;
