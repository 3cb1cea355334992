//! Dispatcher - throttled hand-off from ingestion to the worker pool
//!
//! Owns the run status (through the [`EventGateway`]) and drives shutdown.

use std::sync::Arc;

use async_channel::Sender;
use metrics::counter;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use contracts::RunStatus;

use crate::gateway::EventGateway;
use crate::queue::{Handoff, JobReceiver, JobSubmitter};
use crate::registry::ActiveProbes;

/// Slots per queue. Every job waits in its slot until the next stage
/// acknowledges it, so both hops are rendezvous points and the producer is
/// throttled by worker availability.
const QUEUE_CAPACITY: usize = 1;

/// Create a dispatcher together with its producer and worker endpoints
pub fn channels(
    gateway: Arc<EventGateway>,
    registry: Arc<ActiveProbes>,
) -> (JobSubmitter, Dispatcher, JobReceiver) {
    let (ingest_tx, ingest_rx) = mpsc::channel(QUEUE_CAPACITY);
    let (job_tx, job_rx) = async_channel::bounded(QUEUE_CAPACITY);

    let dispatcher = Dispatcher::new(gateway, registry, job_tx, ingest_rx);
    (
        JobSubmitter::new(ingest_tx),
        dispatcher,
        JobReceiver::new(job_rx),
    )
}

/// Summary of one dispatcher run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherReport {
    /// Jobs accepted by a worker
    pub jobs_forwarded: u64,
    /// Jobs taken from ingestion but never accepted by a worker
    pub jobs_abandoned: u64,
    /// Probes cancelled by shutdown
    pub probes_cancelled: usize,
}

enum Forward {
    Accepted,
    QueueClosed,
    Cancelled,
}

/// Forwards jobs from the ingestion queue to the job queue
pub struct Dispatcher {
    gateway: Arc<EventGateway>,
    registry: Arc<ActiveProbes>,
    job_tx: Sender<Handoff>,
    ingest_rx: mpsc::Receiver<Handoff>,
}

/// Offer `handoff` to the workers; true once one of them accepted it
async fn hand_to_worker(
    job_tx: &Sender<Handoff>,
    handoff: Handoff,
    accepted: &mut oneshot::Receiver<()>,
) -> bool {
    if job_tx.send(handoff).await.is_err() {
        return false;
    }
    accepted.await.is_ok()
}

impl Dispatcher {
    pub(crate) fn new(
        gateway: Arc<EventGateway>,
        registry: Arc<ActiveProbes>,
        job_tx: Sender<Handoff>,
        ingest_rx: mpsc::Receiver<Handoff>,
    ) -> Self {
        Self {
            gateway,
            registry,
            job_tx,
            ingest_rx,
        }
    }

    /// Run until `cancel` fires, then shut the pipeline down.
    ///
    /// Returns after the event channel has been closed.
    #[instrument(name = "dispatcher_run", skip_all)]
    pub async fn run(mut self, cancel: CancellationToken) -> DispatcherReport {
        self.gateway.start().await;
        info!(status = %RunStatus::Running, "Dispatcher started");

        let mut report = DispatcherReport::default();

        loop {
            let incoming = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                incoming = self.ingest_rx.recv() => incoming,
            };

            let Some(incoming) = incoming else {
                // All producers gone; nothing more will arrive
                debug!("ingestion queue closed, waiting for cancellation");
                cancel.cancelled().await;
                break;
            };
            let Some(job) = incoming.accept() else {
                continue;
            };

            let job_id = job.id;
            let (handoff, mut accepted) = Handoff::new(job);
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => Forward::Cancelled,
                taken = hand_to_worker(&self.job_tx, handoff, &mut accepted) => {
                    if taken { Forward::Accepted } else { Forward::QueueClosed }
                }
            };

            match step {
                Forward::Accepted => {
                    report.jobs_forwarded += 1;
                    counter!("pingboard_jobs_dispatched_total").increment(1);
                    debug!(job_id = %job_id, "job forwarded");
                }
                Forward::QueueClosed => {
                    report.jobs_abandoned += 1;
                    warn!(job_id = %job_id, "job queue closed");
                    break;
                }
                Forward::Cancelled => {
                    // A worker may have taken the job just before cancellation
                    accepted.close();
                    if accepted.try_recv().is_ok() {
                        report.jobs_forwarded += 1;
                        counter!("pingboard_jobs_dispatched_total").increment(1);
                    } else {
                        report.jobs_abandoned += 1;
                        warn!(job_id = %job_id, "job abandoned at shutdown");
                    }
                    break;
                }
            }
        }

        self.shutdown(&mut report).await;
        report
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<DispatcherReport> {
        tokio::spawn(self.run(cancel))
    }

    #[instrument(name = "dispatcher_shutdown", skip_all)]
    async fn shutdown(&mut self, report: &mut DispatcherReport) {
        info!("Dispatcher shutting down");

        // 1. No result is published from here on
        self.gateway.mark_stopped().await;

        // 2. Workers drain what is queued, then exit. Dropped hand-offs
        // release the producer with `Closed`.
        self.job_tx.close();
        self.ingest_rx.close();
        while let Ok(handoff) = self.ingest_rx.try_recv() {
            report.jobs_abandoned += 1;
            debug!(job_id = %handoff.job().id, "queued job abandoned");
        }

        // 3. Stop every running probe
        report.probes_cancelled = self.registry.cancel_all();

        // 4 + 5. Terminal status event, then close the event channel
        self.gateway.finish().await;

        info!(
            forwarded = report.jobs_forwarded,
            abandoned = report.jobs_abandoned,
            probes_cancelled = report.probes_cancelled,
            "Dispatcher shutdown complete"
        );
    }
}
