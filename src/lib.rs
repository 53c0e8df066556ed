//! shorturl - short identifier generation and storage engine
//!
//! Maps long URLs to short, fixed-length identifiers derived from the URL and
//! its owner, and stores them in a pluggable backend.
//!
//! # Features
//! - **cli**: Operator command-line interface (default)
//!
//! # Architecture
//! - `utils::short_id`: identifier derivation
//! - `storage`: key-value store, in-memory and relational (sea-orm) backends
//! - `services`: the short link engine and snapshot backup/restore
//! - `context`: cancellation and deadlines for every operation
//! - `config`: TOML + environment configuration
//! - `runtime`: startup/shutdown and execution modes

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod context;
pub mod errors;
pub mod interfaces;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
