//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pingboard - periodic reachability monitor
#[derive(Parser, Debug)]
#[command(
    name = "pingboard",
    author,
    version,
    about = "Periodic reachability monitor",
    long_about = "Pings a configured list of destinations on a fixed interval with a bounded\n\
                  worker pool and streams every probe result to logs, an NDJSON event file\n\
                  and Prometheus metrics."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PINGBOARD_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PINGBOARD_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the monitor until SIGINT or SIGTERM
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "pingboard.toml",
        env = "PINGBOARD_CONFIG"
    )]
    pub config: PathBuf,

    /// Do not publish probe results (no sinks are started)
    #[arg(long)]
    pub no_events: bool,

    /// Also write every event as NDJSON to this file
    #[arg(long, env = "PINGBOARD_EVENTS_FILE")]
    pub events_file: Option<PathBuf>,

    /// Prometheus metrics port (disabled when omitted)
    #[arg(long, env = "PINGBOARD_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Override the worker pool size
    #[arg(long, env = "PINGBOARD_WORKERS")]
    pub workers: Option<usize>,

    /// Override the ping interval in seconds
    #[arg(long, env = "PINGBOARD_INTERVAL")]
    pub interval: Option<u64>,

    /// Stop after this many seconds (0 = run until signalled)
    #[arg(long, default_value = "0", env = "PINGBOARD_TIMEOUT")]
    pub timeout: u64,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "pingboard.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "pingboard.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every destination with its labels
    #[arg(long)]
    pub destinations: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
