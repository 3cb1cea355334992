//! Producer - periodic job generation
//!
//! One pass creates one job per destination, in configuration order, then
//! sleeps for the ping interval. Hand-off blocks until the dispatcher takes
//! the job, so a slow worker pool slows the producer down.

use std::time::Duration;

use contracts::{Destination, Job};
use dispatcher::JobSubmitter;
use metrics::counter;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Why the producer returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Cancellation token fired
    #[default]
    Cancelled,
    /// Dispatcher no longer accepts jobs
    DispatcherClosed,
}

/// Summary of one producer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerStats {
    /// Passes that submitted every destination
    pub passes_completed: u64,
    /// Jobs accepted by the dispatcher
    pub jobs_submitted: u64,
    pub stop_reason: StopReason,
}

/// Periodic job producer
pub struct Producer {
    destinations: Vec<Destination>,
    ping_interval: Duration,
    submitter: JobSubmitter,
}

impl Producer {
    pub fn new(
        destinations: Vec<Destination>,
        ping_interval: Duration,
        submitter: JobSubmitter,
    ) -> Self {
        Self {
            destinations,
            ping_interval,
            submitter,
        }
    }

    /// Produce until cancelled or until the dispatcher closes.
    ///
    /// On cancellation the rest of the current pass is abandoned.
    #[instrument(
        name = "producer_run",
        skip_all,
        fields(destinations = self.destinations.len(), interval_secs = self.ping_interval.as_secs())
    )]
    pub async fn run(self, cancel: CancellationToken) -> ProducerStats {
        info!("Producer started");
        let mut stats = ProducerStats::default();

        loop {
            for destination in &self.destinations {
                let job = Job::new(destination.clone());
                let job_id = job.id;

                let submitted = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!(jobs = stats.jobs_submitted, "Producer cancelled");
                        return stats;
                    }
                    submitted = self.submitter.submit(job) => submitted,
                };

                if submitted.is_err() {
                    info!(jobs = stats.jobs_submitted, "Dispatcher closed, producer stopping");
                    stats.stop_reason = StopReason::DispatcherClosed;
                    return stats;
                }

                stats.jobs_submitted += 1;
                counter!("pingboard_jobs_produced_total").increment(1);
                debug!(job_id = %job_id, address = %destination.address, "job submitted");
            }

            stats.passes_completed += 1;
            debug!(pass = stats.passes_completed, "pass complete");

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(jobs = stats.jobs_submitted, "Producer cancelled");
                    return stats;
                }
                _ = tokio::time::sleep(self.ping_interval) => {}
            }
        }
    }

    /// Spawn the producer as a background task
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<ProducerStats> {
        tokio::spawn(self.run(cancel))
    }
}
