//! Ping command

use colored::Colorize;

use crate::context::OpContext;
use crate::interfaces::cli::CliError;
use crate::services::ShortLinkEngine;
use crate::storage::StorageBackend;

pub async fn ping(engine: &ShortLinkEngine, ctx: &OpContext) -> Result<(), CliError> {
    engine.ping(ctx).await?;
    println!(
        "{} Storage backend {} is reachable",
        "✓".bold().green(),
        engine.storage().kind().to_string().cyan()
    );
    Ok(())
}
