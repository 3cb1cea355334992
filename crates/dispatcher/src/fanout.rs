//! EventFanout - drains the event stream into every sink

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

use contracts::Event;

use crate::handle::SinkHandle;
use crate::metrics::SinkMetricsSnapshot;

/// Consumer side of the event channel.
///
/// Returns once the gateway has closed the channel and every sink has
/// flushed and closed.
pub struct EventFanout {
    handles: Vec<SinkHandle>,
    events: mpsc::Receiver<Event>,
}

impl EventFanout {
    pub fn new(handles: Vec<SinkHandle>, events: mpsc::Receiver<Event>) -> Self {
        Self { handles, events }
    }

    /// Run until the event channel closes
    #[instrument(name = "event_fanout_run", skip(self), fields(sinks = self.handles.len()))]
    pub async fn run(mut self) -> Vec<(String, SinkMetricsSnapshot)> {
        info!(sinks = self.handles.len(), "Event fan-out started");

        let mut event_count: u64 = 0;
        while let Some(event) = self.events.recv().await {
            event_count += 1;
            for handle in &self.handles {
                handle.send(event.clone()).await;
            }
            if event_count.is_multiple_of(100) {
                debug!(events = event_count, "Event fan-out progress");
            }
        }

        info!(events = event_count, "Event channel closed, shutting down sinks");

        let metrics: Vec<_> = self
            .handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();
        for handle in self.handles {
            handle.shutdown().await;
        }
        metrics
            .into_iter()
            .map(|(name, m)| (name, m.snapshot()))
            .collect()
    }

    /// Spawn the fan-out as a background task
    pub fn spawn(self) -> JoinHandle<Vec<(String, SinkMetricsSnapshot)>> {
        tokio::spawn(self.run())
    }
}
