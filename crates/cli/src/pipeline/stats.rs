//! Pipeline statistics and metrics.

use std::time::Duration;

use contracts::{ProbeOutcome, ProbeResult};
use dispatcher::{BoardSnapshot, DispatcherReport, PoolMetricsSnapshot, SinkMetricsSnapshot};
use ingestion::ProducerStats;
use observability::ProbeMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total duration of the run
    pub duration: Duration,

    pub producer: ProducerStats,

    pub dispatcher: DispatcherReport,

    /// Worker pool counters
    pub pool: PoolMetricsSnapshot,

    /// Per-sink counters, by sink name
    pub sinks: Vec<(String, SinkMetricsSnapshot)>,

    /// Aggregated probe results
    pub probe_metrics: ProbeMetricsAggregator,

    /// Last known state per destination (None when events are disabled)
    pub board: Option<BoardSnapshot>,
}

impl PipelineStats {
    /// Completed probes per second
    pub fn probes_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.pool.completed as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Monitor Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Passes completed: {}", self.producer.passes_completed);
        println!("   ├─ Jobs produced: {}", self.producer.jobs_submitted);
        println!("   ├─ Jobs dispatched: {}", self.dispatcher.jobs_forwarded);
        println!("   ├─ Jobs abandoned: {}", self.dispatcher.jobs_abandoned);
        println!("   └─ Probes cancelled at shutdown: {}", self.dispatcher.probes_cancelled);

        println!("\n⚙️  Worker Pool");
        println!("   ├─ Completed: {}", self.pool.completed);
        println!("   ├─ Failed: {}", self.pool.failed);
        println!("   ├─ Cancelled: {}", self.pool.cancelled);
        println!("   ├─ Peak in flight: {}", self.pool.peak_in_flight);
        println!("   └─ Probes/s: {:.2}", self.probes_per_sec());

        if !self.sinks.is_empty() {
            println!("\n📤 Sinks ({})", self.sinks.len());
            for (i, (name, metrics)) in self.sinks.iter().enumerate() {
                let prefix = if i == self.sinks.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {}: handled={} failed={} dropped={}",
                    prefix,
                    name,
                    metrics.handled_count,
                    metrics.failure_count,
                    metrics.dropped_count
                );
            }
        }

        if let Some(board) = &self.board {
            println!("\n📍 Destinations ({}, {})", board.entries.len(), board.status);
            for (i, entry) in board.entries.iter().enumerate() {
                let prefix = if i == board.entries.len() - 1 { "└─" } else { "├─" };
                let last = entry
                    .last_outcome
                    .as_ref()
                    .map_or_else(|| "no result".to_string(), describe_outcome);
                println!(
                    "   {} {} ({}) ok={} failed={} last: {}",
                    prefix,
                    entry.destination.name,
                    entry.destination.address,
                    entry.completed,
                    entry.failed,
                    last
                );
            }
        }

        println!("\n{}", self.probe_metrics.summary());
    }
}

/// One-line summary of the latest outcome for a destination
fn describe_outcome(outcome: &ProbeOutcome) -> String {
    match &outcome.result {
        ProbeResult::Completed(stats) => format!(
            "{:.2} ms, {:.1}% loss",
            stats.avg_rtt.as_secs_f64() * 1000.0,
            stats.packet_loss_pct
        ),
        ProbeResult::Failed(failure) => match &failure.stats {
            Some(stats) => format!(
                "failed: {} ({:.1}% loss)",
                failure.message, stats.packet_loss_pct
            ),
            None => format!("failed: {}", failure.message),
        },
    }
}
