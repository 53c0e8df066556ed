//! Link management commands

use colored::Colorize;

use crate::context::OpContext;
use crate::interfaces::cli::CliError;
use crate::services::{BatchCreateResult, ShortLinkEngine};
use crate::storage::ShortLink;

fn require_owner(owner: Option<&str>) -> Result<&str, CliError> {
    match owner {
        Some(o) if !o.is_empty() => Ok(o),
        _ => Err(CliError::ParseError(
            "this command needs --owner <OWNER>".to_string(),
        )),
    }
}

fn format_link(link: &ShortLink) -> String {
    let mut parts = vec![format!(
        "{} -> {}",
        link.short_identifier.cyan(),
        link.url.blue().underline()
    )];
    if let Some(deleted_at) = link.deleted_at {
        parts.push(
            format!("(deleted: {})", deleted_at.format("%Y-%m-%d %H:%M:%S UTC"))
                .dimmed()
                .red()
                .to_string(),
        );
    }
    parts.join(" ")
}

fn print_batch(result: &BatchCreateResult) {
    for outcome in &result.outcomes {
        match (&outcome.link, &outcome.error) {
            (Some(link), None) => println!("  {} {}", "✓".green(), format_link(link)),
            (Some(link), Some(_)) if outcome.is_duplicate() => {
                println!("  {} {} {}", "=".yellow(), format_link(link), "(exists)".dimmed())
            }
            (_, Some(e)) => println!("  {} {}: {}", "✗".red(), outcome.url, e),
            (None, None) => {}
        }
    }
    println!();
    println!(
        "{} {} created, {} existing, {} failed",
        "ℹ".bold().blue(),
        result.created().to_string().green(),
        result.duplicates().to_string().yellow(),
        result.failed().to_string().red()
    );
}

/// `create <URL>...`
pub async fn create_links(
    engine: &ShortLinkEngine,
    ctx: &OpContext,
    owner: Option<&str>,
    urls: Vec<String>,
) -> Result<(), CliError> {
    match (owner.filter(|o| !o.is_empty()), urls.as_slice()) {
        (Some(owner), [url]) => {
            let (link, is_new) = engine.create(ctx, owner, url).await?;
            let action = if is_new { "Created" } else { "Already exists" };
            println!("{} {}: {}", "✓".bold().green(), action, format_link(&link));
        }
        (Some(owner), _) => {
            let result = engine.batch_create(ctx, owner, &urls).await?;
            print_batch(&result);
        }
        (None, _) => {
            for url in &urls {
                let (link, is_new) = engine.create_anonymous(ctx, url).await?;
                let action = if is_new { "Created" } else { "Already exists" };
                println!("{} {}: {}", "✓".bold().green(), action, format_link(&link));
            }
        }
    }
    Ok(())
}

/// `batch-create <FILE>`: one URL per line, blank lines and `#` comments skipped
pub async fn batch_create_from_file(
    engine: &ShortLinkEngine,
    ctx: &OpContext,
    owner: Option<&str>,
    file_path: &str,
) -> Result<(), CliError> {
    let owner = require_owner(owner)?;
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|e| CliError::CommandError(format!("Failed to read {}: {}", file_path, e)))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        println!("{} No URLs found in {}", "ℹ".bold().blue(), file_path);
        return Ok(());
    }

    let result = engine.batch_create(ctx, owner, &urls).await?;
    print_batch(&result);
    Ok(())
}

pub async fn get_link(
    engine: &ShortLinkEngine,
    ctx: &OpContext,
    short_identifier: &str,
) -> Result<(), CliError> {
    let link = engine.get_by_short_identifier(ctx, short_identifier).await?;
    println!("{}", format_link(&link));
    println!(
        "  {} {}",
        "owner:".dimmed(),
        if link.owner_uuid.is_empty() {
            "<anonymous>"
        } else {
            link.owner_uuid.as_str()
        }
    );
    println!(
        "  {} {}",
        "created:".dimmed(),
        link.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  {} {}",
        "updated:".dimmed(),
        link.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

pub async fn resolve_link(
    engine: &ShortLinkEngine,
    ctx: &OpContext,
    short_identifier: &str,
) -> Result<(), CliError> {
    let link = engine.resolve(ctx, short_identifier).await?;
    println!("{}", link.url);
    Ok(())
}

pub async fn find_url(
    engine: &ShortLinkEngine,
    ctx: &OpContext,
    owner: Option<&str>,
    url: &str,
) -> Result<(), CliError> {
    let owner = require_owner(owner)?;
    let link = engine.get_by_url(ctx, owner, url).await?;
    println!("{}", format_link(&link));
    Ok(())
}

pub async fn list_links(
    engine: &ShortLinkEngine,
    ctx: &OpContext,
    owner: Option<&str>,
) -> Result<(), CliError> {
    let owner = require_owner(owner)?;
    let links = engine.get_all_by_owner(ctx, owner).await?;

    if links.is_empty() {
        println!("{} No short links found", "ℹ".bold().blue());
        return Ok(());
    }

    println!("{}", "Short link list:".bold().green());
    println!();
    for link in &links {
        println!("  {}", format_link(link));
    }
    println!();
    println!(
        "{} Total {} short links",
        "ℹ".bold().blue(),
        links.len().to_string().green()
    );
    Ok(())
}

pub async fn delete_links(
    engine: &ShortLinkEngine,
    ctx: &OpContext,
    owner: Option<&str>,
    short_identifiers: Vec<String>,
) -> Result<(), CliError> {
    let owner = require_owner(owner)?;
    let marked = engine.mark_deleted(ctx, owner, &short_identifiers).await?;
    println!(
        "{} Marked {} of {} short links deleted for {}",
        "✓".bold().green(),
        marked.to_string().green(),
        short_identifiers.len(),
        owner.cyan()
    );
    if marked < short_identifiers.len() {
        println!(
            "{} The rest were unknown, owned by someone else, or already deleted",
            "ℹ".bold().blue()
        );
    }
    Ok(())
}
