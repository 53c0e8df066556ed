//! Backup / restore commands

use std::path::Path;

use colored::Colorize;

use crate::context::OpContext;
use crate::interfaces::cli::CliError;
use crate::services::ShortLinkEngine;

pub async fn backup_links(
    engine: &ShortLinkEngine,
    ctx: &OpContext,
    file_path: &str,
) -> Result<(), CliError> {
    let written = engine.backup(ctx, Path::new(file_path)).await?;
    println!(
        "{} Backed up {} records to {}",
        "✓".bold().green(),
        written.to_string().green(),
        file_path.blue()
    );
    Ok(())
}

pub async fn restore_links(
    engine: &ShortLinkEngine,
    ctx: &OpContext,
    file_path: &str,
    batch_size: usize,
) -> Result<(), CliError> {
    let report = engine.restore(ctx, Path::new(file_path), batch_size).await?;
    println!(
        "{} Restored {} records from {}",
        "✓".bold().green(),
        report.restored.to_string().green(),
        file_path.blue()
    );
    if report.duplicates > 0 {
        println!(
            "  {} {} already present",
            "ℹ".bold().blue(),
            report.duplicates.to_string().yellow()
        );
    }
    if report.failed > 0 {
        println!(
            "  {} {} failed (see log)",
            "✗".bold().red(),
            report.failed.to_string().red()
        );
    }
    Ok(())
}
