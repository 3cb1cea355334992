//! `validate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::MonitorBlueprint;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    destination_count: usize,
    worker_pool_size: usize,
    ping_interval_secs: u64,
    min_packet_num: u32,
    max_packet_num: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(&args.config);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(path: &Path) -> ValidationResult {
    let config_path = path.display().to_string();

    match load_blueprint(path) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    destination_count: blueprint.destinations.len(),
                    worker_pool_size: blueprint.pipeline.worker_pool_size,
                    ping_interval_secs: blueprint.pipeline.ping_interval,
                    min_packet_num: blueprint.probe.min_packet_num,
                    max_packet_num: blueprint.probe.max_packet_num,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &MonitorBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let probe = &blueprint.probe;
    let pipeline = &blueprint.pipeline;

    // A probe sends up to max-1 packets spaced by the packet interval
    let longest_probe = probe.packet_interval() * probe.max_packet_num.saturating_sub(1)
        + probe.timeout();
    if longest_probe > pipeline.ping_interval() {
        warnings.push(format!(
            "A probe can take up to {}s, longer than the {}s ping interval",
            longest_probe.as_secs(),
            pipeline.ping_interval
        ));
    }

    if pipeline.worker_pool_size > blueprint.destinations.len() {
        warnings.push(format!(
            "worker_pool_size ({}) exceeds the number of destinations ({}); extra workers stay idle",
            pipeline.worker_pool_size,
            blueprint.destinations.len()
        ));
    }

    if blueprint.logging.file_enabled && !blueprint.logging.console_enabled {
        warnings.push(format!(
            "Console logging disabled; logs only go to {} and {}",
            blueprint.logging.file_output.display(),
            blueprint.logging.debug_output.display()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Destinations: {}", summary.destination_count);
            println!("  Workers: {}", summary.worker_pool_size);
            println!("  Ping interval: {}s", summary.ping_interval_secs);
            println!(
                "  Packets per probe: {}..{}",
                summary.min_packet_num, summary.max_packet_num
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
