//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::MonitorBlueprint;
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    destination_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    destinations: Vec<DestinationInfo>,
    probe: ProbeInfo,
    pipeline: PipelineInfo,
    logging: LoggingInfo,
}

#[derive(Serialize)]
struct DestinationInfo {
    name: String,
    address: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    labels: BTreeMap<String, serde_json::Value>,
}

#[derive(Serialize)]
struct ProbeInfo {
    min_packet_num: u32,
    max_packet_num: u32,
    ping_timeout_secs: u64,
    packet_interval_ms: u64,
}

#[derive(Serialize)]
struct PipelineInfo {
    ping_interval_secs: u64,
    worker_pool_size: usize,
    event_buffer: usize,
}

#[derive(Serialize)]
struct LoggingInfo {
    console_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_output: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args.destinations);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args.destinations);
    }

    Ok(())
}

fn build_config_info(blueprint: &MonitorBlueprint, with_destinations: bool) -> ConfigInfo {
    let destinations = if with_destinations {
        blueprint
            .destinations
            .iter()
            .map(|d| DestinationInfo {
                name: d.name.clone(),
                address: d.address.clone(),
                labels: d.labels.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        destination_count: blueprint.destinations.len(),
        destinations,
        probe: ProbeInfo {
            min_packet_num: blueprint.probe.min_packet_num,
            max_packet_num: blueprint.probe.max_packet_num,
            ping_timeout_secs: blueprint.probe.ping_timeout,
            packet_interval_ms: blueprint.probe.packet_interval_ms,
        },
        pipeline: PipelineInfo {
            ping_interval_secs: blueprint.pipeline.ping_interval,
            worker_pool_size: blueprint.pipeline.worker_pool_size,
            event_buffer: blueprint.pipeline.event_buffer,
        },
        logging: LoggingInfo {
            console_enabled: blueprint.logging.console_enabled,
            file_output: blueprint
                .logging
                .file_enabled
                .then(|| blueprint.logging.file_output.display().to_string()),
            debug_output: blueprint
                .logging
                .file_enabled
                .then(|| blueprint.logging.debug_output.display().to_string()),
        },
    }
}

fn print_config_info(blueprint: &MonitorBlueprint, with_destinations: bool) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  Pingboard Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let probe = &blueprint.probe;
    println!("📡 Probe");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!(
        "   ├─ Packets per probe: {}..{}",
        probe.min_packet_num, probe.max_packet_num
    );
    println!("   ├─ Packet interval: {} ms", probe.packet_interval_ms);
    println!("   └─ Ping timeout: {}s", probe.ping_timeout);

    let pipeline = &blueprint.pipeline;
    println!("\n⚙️  Pipeline");
    println!("   ├─ Ping interval: {}s", pipeline.ping_interval);
    println!("   ├─ Workers: {}", pipeline.worker_pool_size);
    println!("   └─ Event buffer: {}", pipeline.event_buffer);

    println!("\n📍 Destinations ({})", blueprint.destinations.len());
    if with_destinations {
        for (i, dest) in blueprint.destinations.iter().enumerate() {
            let is_last = i == blueprint.destinations.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            if dest.labels.is_empty() {
                println!("   {} {} ({})", prefix, dest.name, dest.address);
            } else {
                let labels = serde_json::to_string(&dest.labels).unwrap_or_default();
                println!("   {} {} ({}) {}", prefix, dest.name, dest.address, labels);
            }
        }
    }

    let logging = &blueprint.logging;
    println!("\n📝 Logging");
    println!("   ├─ Console: {}", logging.console_enabled);
    if logging.file_enabled {
        println!("   ├─ Results file: {}", logging.file_output.display());
        println!("   └─ Debug file: {}", logging.debug_output.display());
    } else {
        println!("   └─ File: disabled");
    }

    println!();
}
