//! CLI interface module
//!
//! This module provides command-line interface functionality for shorturl.

pub mod commands;

use std::fmt;

use crate::cli::Commands;
use crate::config::AppConfig;
use crate::context::OpContext;
use crate::errors::{ServiceError, ShorturlError};
use crate::services::ShortLinkEngine;

#[derive(Debug)]
pub enum CliError {
    StartupError(String),
    ParseError(String),
    CommandError(String),
    Service(ServiceError),
}

impl CliError {
    /// Format as simple output
    pub fn format_simple(&self) -> String {
        match self {
            CliError::StartupError(msg) => format!("Startup error: {}", msg),
            CliError::ParseError(msg) => format!("Parse error: {}", msg),
            CliError::CommandError(msg) => format!("Command error: {}", msg),
            CliError::Service(err) => err.to_string(),
        }
    }

    /// Format as colored output
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        match self {
            CliError::StartupError(msg) => {
                format!("{} {}", "Startup error:".red().bold(), msg.white())
            }
            CliError::ParseError(msg) => {
                format!("{} {}", "Parse error:".yellow().bold(), msg.white())
            }
            CliError::CommandError(msg) => {
                format!("{} {}", "Command error:".red().bold(), msg.white())
            }
            CliError::Service(err) => err.format_colored(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for CliError {}

impl From<ServiceError> for CliError {
    fn from(err: ServiceError) -> Self {
        CliError::Service(err)
    }
}

impl From<ShorturlError> for CliError {
    fn from(err: ShorturlError) -> Self {
        match err {
            ShorturlError::Service(e) => CliError::Service(e),
            other => CliError::StartupError(other.format_simple()),
        }
    }
}

/// Run one engine-backed command
///
/// `config` subcommands never reach here; they run before any storage is
/// opened.
pub async fn run_cli_command(
    engine: &ShortLinkEngine,
    config: &AppConfig,
    ctx: &OpContext,
    owner: Option<&str>,
    cmd: Commands,
) -> Result<(), CliError> {
    let snapshot_path =
        |p: Option<String>| p.unwrap_or_else(|| config.storage.file_storage_path.clone());

    match cmd {
        Commands::Create { urls } => commands::create_links(engine, ctx, owner, urls).await,
        Commands::BatchCreate { file_path } => {
            commands::batch_create_from_file(engine, ctx, owner, &file_path).await
        }
        Commands::Get { short_identifier } => {
            commands::get_link(engine, ctx, &short_identifier).await
        }
        Commands::Resolve { short_identifier } => {
            commands::resolve_link(engine, ctx, &short_identifier).await
        }
        Commands::FindUrl { url } => commands::find_url(engine, ctx, owner, &url).await,
        Commands::List => commands::list_links(engine, ctx, owner).await,
        Commands::Delete { short_identifiers } => {
            commands::delete_links(engine, ctx, owner, short_identifiers).await
        }
        Commands::Backup { file_path } => {
            commands::backup_links(engine, ctx, &snapshot_path(file_path)).await
        }
        Commands::Restore { file_path } => {
            commands::restore_links(
                engine,
                ctx,
                &snapshot_path(file_path),
                config.storage.restore_batch_size,
            )
            .await
        }
        Commands::Ping => commands::ping(engine, ctx).await,
        Commands::Config { .. } => Err(CliError::CommandError(
            "config commands do not use storage".to_string(),
        )),
    }
}
