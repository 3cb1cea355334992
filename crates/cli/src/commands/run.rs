//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::MonitorBlueprint;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs, mut blueprint: MonitorBlueprint) -> Result<()> {
    // Apply CLI overrides
    let mut overridden = false;
    if let Some(workers) = args.workers {
        info!(workers, "Overriding worker pool size from CLI");
        blueprint.pipeline.worker_pool_size = workers;
        overridden = true;
    }
    if let Some(interval) = args.interval {
        info!(interval_secs = interval, "Overriding ping interval from CLI");
        blueprint.pipeline.ping_interval = interval;
        overridden = true;
    }
    if overridden {
        config_loader::ConfigLoader::validate(&blueprint)
            .context("Invalid command-line overrides")?;
    }

    info!(
        destinations = blueprint.destinations.len(),
        workers = blueprint.pipeline.worker_pool_size,
        interval_secs = blueprint.pipeline.ping_interval,
        packets = ?blueprint.probe.packet_range(),
        "Configuration loaded"
    );

    let pipeline_config = PipelineConfig {
        blueprint,
        events_enabled: !args.no_events,
        events_file: args.events_file.clone(),
        metrics_port: args.metrics_port,
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
    };

    // Setup graceful shutdown handler
    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = shutdown_signal() => {
                    warn!("Received shutdown signal, stopping monitor...");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        }
    });

    info!("Starting monitor...");
    let result = Pipeline::new(pipeline_config).run(cancel.clone()).await;
    cancel.cancel();
    signal_task.abort();

    let stats = result.context("Pipeline execution failed")?;
    info!(
        jobs = stats.producer.jobs_submitted,
        completed = stats.pool.completed,
        failed = stats.pool.failed,
        duration_secs = stats.duration.as_secs_f64(),
        "Monitor stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
