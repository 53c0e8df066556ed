//! CLI mode
//!
//! Startup (backend + snapshot restore), one command under a deadline, then
//! shutdown (snapshot backup). Ctrl+C cancels the running command.

use std::time::Duration;

use tracing::warn;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::AppConfig;
use crate::context::OpContext;
use crate::interfaces::cli::{CliError, commands, run_cli_command};
use crate::runtime::lifetime;

/// Run CLI mode
pub async fn run_cli(cli: Cli, config: &AppConfig) -> Result<(), CliError> {
    let Cli { owner, command, .. } = cli;

    if let Commands::Config {
        action: ConfigCommands::Generate { output_path, force },
    } = command
    {
        return commands::config_generate(output_path, force).await;
    }

    let engine = lifetime::startup::prepare_engine(config).await?;

    let ctx = OpContext::with_timeout(Duration::from_millis(config.engine.operation_timeout_ms));
    let interrupt = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling current command");
                ctx.cancel();
            }
        })
    };

    let result = run_cli_command(&engine, config, &ctx, owner.as_deref(), command).await;
    interrupt.abort();

    // 命令失败也要落盘，内存中可能已有变更
    let saved = lifetime::shutdown::finalize_engine(&engine, config).await;

    result?;
    saved?;
    Ok(())
}
