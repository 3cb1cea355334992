//! # Pingboard CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 监控管道编排与生命周期管理
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use contracts::LoggingConfig;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{load_blueprint, run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Execute command; `run` takes its log outputs from the configuration file
    let result = match &cli.command {
        Commands::Run(args) => {
            let blueprint = load_blueprint(&args.config)?;
            init_logging(&cli, Some(&blueprint.logging))?;
            run_pipeline(args, blueprint).await
        }
        Commands::Validate(args) => {
            init_logging(&cli, None)?;
            run_validate(args)
        }
        Commands::Info(args) => {
            init_logging(&cli, None)?;
            run_info(args)
        }
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options and the configured outputs
fn init_logging(cli: &Cli, logging: Option<&LoggingConfig>) -> Result<()> {
    let default_log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let config = ObservabilityConfig {
        log_format: cli.log_format.into(),
        metrics_port: None,
        default_log_level: default_log_level.to_string(),
        console_enabled: logging.map_or(true, |l| l.console_enabled),
        log_file: logging
            .filter(|l| l.file_enabled)
            .map(|l| l.file_output.clone()),
        debug_log_file: logging
            .filter(|l| l.file_enabled)
            .map(|l| l.debug_output.clone()),
    };

    observability::init_with_config(config)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Pingboard starting");
    Ok(())
}
