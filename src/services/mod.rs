//! Service layer for business logic
//!
//! The engine is shared by every caller (operator CLI here, an HTTP layer in
//! a full deployment).

mod link_service;
pub mod snapshot;

pub use link_service::*;
pub use snapshot::RestoreReport;
