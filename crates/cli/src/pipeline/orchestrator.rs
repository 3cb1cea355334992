//! Pipeline orchestrator - wires producer, dispatcher, workers and sinks.
//!
//! Probes with ICMP when the `icmp` feature is enabled. Without it the
//! pipeline runs against the mock prober.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{MonitorBlueprint, ProbeExecutor};
use dispatcher::{
    channels, ActiveProbes, EventFanout, EventGateway, FileSink, FileSinkConfig, LogSink,
    SinkHandle, StatusBoard, WorkerPool,
};
use ingestion::Producer;
use observability::ProbeMetricsAggregator;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{MetricsSink, PipelineStats};
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated monitor configuration
    pub blueprint: MonitorBlueprint,

    /// Publish probe results to sinks
    pub events_enabled: bool,

    /// NDJSON event file (None = disabled)
    pub events_file: Option<PathBuf>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Stop after this long (None = run until cancelled)
    pub timeout: Option<Duration>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until `cancel` fires (or the timeout elapses), then shut down
    pub async fn run(self, cancel: CancellationToken) -> Result<PipelineStats> {
        #[cfg(feature = "icmp")]
        let executor = prober::IcmpProber::new();

        #[cfg(not(feature = "icmp"))]
        let executor = {
            warn!("Built without ICMP support, probing with the mock prober");
            prober::MockProber::new()
        };

        self.run_with(Arc::new(executor), cancel).await
    }

    /// Run with an explicit probe executor
    pub async fn run_with<E: ProbeExecutor>(
        self,
        executor: Arc<E>,
        cancel: CancellationToken,
    ) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let PipelineConfig {
            blueprint,
            events_enabled,
            events_file,
            metrics_port,
            timeout,
        } = self.config;

        // Initialize Metrics (optional)
        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let settings = &blueprint.pipeline;
        let registry = Arc::new(ActiveProbes::new());
        let aggregator = Arc::new(Mutex::new(ProbeMetricsAggregator::new()));

        // Event stream and sinks
        let (gateway, fanout, board) = if events_enabled {
            let (tx, rx) = mpsc::channel(settings.event_buffer);
            let board = StatusBoard::new("status_board", &blueprint.destinations);

            let mut handles = vec![
                SinkHandle::spawn(LogSink::new("log"), settings.event_buffer),
                SinkHandle::spawn(board.clone(), settings.event_buffer),
                SinkHandle::spawn(
                    MetricsSink::new("metrics", Arc::clone(&aggregator)),
                    settings.event_buffer,
                ),
            ];
            if let Some(path) = events_file {
                let sink = FileSink::new("events_file", FileSinkConfig::new(&path))
                    .with_context(|| format!("Failed to open events file {}", path.display()))?;
                handles.push(SinkHandle::spawn(sink, settings.event_buffer));
            }

            info!(sinks = handles.len(), "Event sinks started");
            let fanout = EventFanout::new(handles, rx).spawn();
            (Arc::new(EventGateway::new(tx)), Some(fanout), Some(board))
        } else {
            info!("Event publishing disabled");
            (Arc::new(EventGateway::disabled()), None, None)
        };

        let (submitter, dispatcher, jobs) = channels(Arc::clone(&gateway), Arc::clone(&registry));

        let pool = WorkerPool::spawn(
            settings.worker_pool_size,
            executor,
            blueprint.probe.clone(),
            Arc::clone(&registry),
            Arc::clone(&gateway),
            jobs,
        );
        let dispatcher_handle = dispatcher.spawn(cancel.clone());
        let producer_handle = Producer::new(
            blueprint.destinations.clone(),
            settings.ping_interval(),
            submitter,
        )
        .spawn(cancel.clone());

        info!(
            destinations = blueprint.destinations.len(),
            workers = pool.size(),
            interval_secs = settings.ping_interval,
            "Monitor running"
        );

        match timeout {
            Some(limit) => {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        info!(timeout_secs = limit.as_secs(), "Timeout reached, stopping monitor");
                        cancel.cancel();
                    }
                }
            }
            None => cancel.cancelled().await,
        }

        // Shutdown: dispatcher closes the stream, then sinks drain, then workers exit
        let producer = producer_handle
            .await
            .map_err(|e| CliError::task_failed("producer", e.to_string()))?;
        let report = dispatcher_handle
            .await
            .map_err(|e| CliError::task_failed("dispatcher", e.to_string()))?;
        let sinks = match fanout {
            Some(handle) => handle
                .await
                .map_err(|e| CliError::task_failed("event_fanout", e.to_string()))?,
            None => Vec::new(),
        };
        let pool = pool.join().await;

        if !registry.is_empty() {
            warn!(remaining = registry.len(), "Active probes left after shutdown");
        }

        let probe_metrics = aggregator
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        Ok(PipelineStats {
            duration: start_time.elapsed(),
            producer,
            dispatcher: report,
            pool,
            sinks,
            probe_metrics,
            board: board.map(|b| b.snapshot()),
        })
    }
}
