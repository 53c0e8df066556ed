//! CLI command implementations
//!
//! This module re-exports all CLI command functions.

mod config_gen;
mod link_management;
mod snapshot;
mod status;

pub use config_gen::*;
pub use link_management::*;
pub use snapshot::*;
pub use status::*;
