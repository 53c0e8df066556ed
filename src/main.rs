use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use shorturl::cli::{Cli, Commands, ConfigCommands};
use shorturl::config::AppConfig;
use shorturl::interfaces::cli::commands::config_generate;
use shorturl::runtime::modes::run_cli;
use shorturl::system::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // 生成配置不依赖现有配置文件
    if let Commands::Config {
        action: ConfigCommands::Generate { output_path, force },
    } = cli.command
    {
        return Ok(match config_generate(output_path, force).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{}", e.format_colored());
                ExitCode::FAILURE
            }
        });
    }

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e.format_colored());
            return Ok(ExitCode::FAILURE);
        }
    };

    let _guard = init_logging(&config.logging).context("Failed to initialize logging")?;

    match run_cli(cli, &config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("{}", e.format_colored());
            Ok(ExitCode::FAILURE)
        }
    }
}
