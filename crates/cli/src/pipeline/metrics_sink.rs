//! MetricsSink - feeds events into the metrics facade and the run summary.

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ContractError, Event, EventSink};
use observability::{record_probe_outcome, record_run_status, ProbeMetricsAggregator};

/// Records every event as metrics and aggregates results in memory
pub struct MetricsSink {
    name: String,
    aggregator: Arc<Mutex<ProbeMetricsAggregator>>,
}

impl MetricsSink {
    pub fn new(name: impl Into<String>, aggregator: Arc<Mutex<ProbeMetricsAggregator>>) -> Self {
        Self {
            name: name.into(),
            aggregator,
        }
    }
}

impl EventSink for MetricsSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&mut self, event: &Event) -> Result<(), ContractError> {
        match event {
            Event::StatusChanged(status) => record_run_status(*status),
            Event::ResultRecorded(outcome) => {
                record_probe_outcome(outcome);
                self.aggregator
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .update(outcome);
            }
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
