//! Mode routing
//!
//! Only the operator CLI mode exists; the HTTP layer that would sit on the
//! same engine lives outside this crate.

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "cli")]
pub use cli::run_cli;
