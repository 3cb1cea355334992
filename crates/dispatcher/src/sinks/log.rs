//! LogSink - logs probe results via tracing

use contracts::{ContractError, Event, EventSink, ProbeOutcome, ProbeResult};
use tracing::{info, instrument, warn};

fn millis(d: std::time::Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Sink that writes one structured log line per event
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_outcome(&self, outcome: &ProbeOutcome) {
        let labels = serde_json::to_string(&outcome.destination.labels).unwrap_or_default();
        match &outcome.result {
            ProbeResult::Completed(stats) => info!(
                sink = %self.name,
                job_id = %outcome.job_id,
                destination = %outcome.destination.name,
                address = %outcome.destination.address,
                labels = %labels,
                packets_sent = stats.packets_sent,
                packets_received = stats.packets_received,
                packet_loss_pct = stats.packet_loss_pct,
                min_rtt_ms = millis(stats.min_rtt),
                avg_rtt_ms = millis(stats.avg_rtt),
                max_rtt_ms = millis(stats.max_rtt),
                stddev_rtt_ms = millis(stats.stddev_rtt),
                "Probe result"
            ),
            ProbeResult::Failed(failure) => warn!(
                sink = %self.name,
                job_id = %outcome.job_id,
                destination = %outcome.destination.name,
                address = %outcome.destination.address,
                labels = %labels,
                kind = ?failure.kind,
                error = %failure.message,
                packets_sent = failure.stats.as_ref().map(|s| s.packets_sent),
                packet_loss_pct = failure.stats.as_ref().map(|s| s.packet_loss_pct),
                "Probe failed"
            ),
        }
    }
}

impl EventSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_sink_handle", skip(self, event), fields(sink = %self.name))]
    async fn handle(&mut self, event: &Event) -> Result<(), ContractError> {
        match event {
            Event::StatusChanged(status) => {
                info!(sink = %self.name, status = %status, "Run status changed");
            }
            Event::ResultRecorded(outcome) => self.log_outcome(outcome),
        }
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
