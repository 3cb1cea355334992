//! WorkerPool - fixed set of probe workers
//!
//! Each worker takes jobs from the shared job queue until it is closed and
//! drained, runs one probe per job and publishes exactly one result per
//! finished probe. Cancelled probes publish nothing.

use std::ops::Range;
use std::sync::Arc;

use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use contracts::{
    Job, ProbeCallbacks, ProbeError, ProbeExecutor, ProbeFailure, ProbeOutcome, ProbeRequest,
    ProbeSession, ProbeSettings,
};

use crate::gateway::EventGateway;
use crate::metrics::{PoolMetrics, PoolMetricsSnapshot};
use crate::queue::JobReceiver;
use crate::registry::{ActiveProbeHandle, ActiveProbes};

/// Draw a packet count from the half-open `range`.
///
/// An empty range yields its start.
pub fn sample_packet_count<R: Rng>(rng: &mut R, range: Range<u32>) -> u32 {
    if range.is_empty() {
        return range.start;
    }
    rng.random_range(range)
}

/// Shared state of all workers
struct WorkerContext<E> {
    executor: Arc<E>,
    settings: ProbeSettings,
    registry: Arc<ActiveProbes>,
    gateway: Arc<EventGateway>,
    metrics: Arc<PoolMetrics>,
}

/// Handle to the spawned workers
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    metrics: Arc<PoolMetrics>,
}

impl WorkerPool {
    /// Spawn exactly `size` workers consuming `jobs`
    #[instrument(name = "worker_pool_spawn", skip_all, fields(size = size))]
    pub fn spawn<E: ProbeExecutor>(
        size: usize,
        executor: Arc<E>,
        settings: ProbeSettings,
        registry: Arc<ActiveProbes>,
        gateway: Arc<EventGateway>,
        jobs: JobReceiver,
    ) -> Self {
        let metrics = Arc::new(PoolMetrics::new());
        let ctx = Arc::new(WorkerContext {
            executor,
            settings,
            registry,
            gateway,
            metrics: Arc::clone(&metrics),
        });

        let workers = (0..size)
            .map(|worker_id| {
                let ctx = Arc::clone(&ctx);
                let jobs = jobs.clone();
                tokio::spawn(async move { worker_loop(worker_id, ctx, jobs).await })
            })
            .collect();

        info!(workers = size, "worker pool started");
        Self { workers, metrics }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Wait for every worker to exit
    #[instrument(name = "worker_pool_join", skip(self))]
    pub async fn join(self) -> PoolMetricsSnapshot {
        for worker in self.workers {
            if let Err(e) = worker.await {
                error!(error = ?e, "Worker task panicked");
            }
        }
        let snapshot = self.metrics.snapshot();
        info!(
            completed = snapshot.completed,
            failed = snapshot.failed,
            cancelled = snapshot.cancelled,
            "worker pool stopped"
        );
        snapshot
    }
}

#[instrument(name = "worker_loop", skip_all, fields(worker_id = worker_id))]
async fn worker_loop<E: ProbeExecutor>(
    worker_id: usize,
    ctx: Arc<WorkerContext<E>>,
    jobs: JobReceiver,
) {
    debug!("worker started");
    while let Some(job) = jobs.recv().await {
        ctx.metrics.inc_jobs_received();
        ctx.process(worker_id, job).await;
    }
    debug!("job queue closed, worker exiting");
}

/// Label map rendered once per job for the log span
fn render_labels(job: &Job) -> String {
    serde_json::to_string(&job.destination.labels).unwrap_or_default()
}

impl<E: ProbeExecutor> WorkerContext<E> {
    fn request_for(&self, job: &Job) -> ProbeRequest {
        let packet_count = sample_packet_count(&mut rand::rng(), self.settings.packet_range());
        ProbeRequest {
            address: job.address().to_string(),
            packet_count,
            timeout: self.settings.timeout(),
            packet_interval: self.settings.packet_interval(),
        }
    }

    #[instrument(
        name = "worker_process_job",
        skip_all,
        fields(
            worker_id = worker_id,
            job_id = %job.id,
            address = %job.destination.address,
            destination = %job.destination.name,
            labels = %render_labels(&job),
        )
    )]
    async fn process(&self, worker_id: usize, job: Job) {
        let request = self.request_for(&job);
        debug!(packet_count = request.packet_count, "probe requested");

        let session = match self.executor.create(request).await {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "probe construction failed");
                self.metrics.inc_failed();
                let outcome =
                    ProbeOutcome::failed(job.id, job.destination, ProbeFailure::construction(&e));
                self.gateway.publish_result(outcome).await;
                return;
            }
        };

        let probe_id = session.probe_id();
        let handle = ActiveProbeHandle::new(probe_id, job.address(), session.cancel_token());
        let on_start_registry = Arc::clone(&self.registry);
        let on_finish_registry = Arc::clone(&self.registry);
        let callbacks = ProbeCallbacks::new()
            .on_start(move || {
                on_start_registry.register(handle);
            })
            .on_finish(move |_| {
                on_finish_registry.deregister(probe_id);
            });

        self.metrics.probe_started();
        let result = session.run(callbacks).await;
        self.metrics.probe_stopped();
        // on_finish does not fire on failure or cancellation
        self.registry.deregister(probe_id);

        let outcome = match result {
            Ok(stats) => {
                info!(
                    probe_id = %probe_id,
                    sent = stats.packets_sent,
                    received = stats.packets_received,
                    loss_pct = stats.packet_loss_pct,
                    avg_rtt_ms = stats.avg_rtt.as_secs_f64() * 1000.0,
                    "probe completed"
                );
                self.metrics.inc_completed();
                ProbeOutcome::completed(job.id, job.destination, stats)
            }
            Err(ProbeError::Cancelled) => {
                info!(probe_id = %probe_id, "probe cancelled");
                self.metrics.inc_cancelled();
                return;
            }
            Err(e) => {
                warn!(probe_id = %probe_id, error = %e, "probe failed");
                self.metrics.inc_failed();
                ProbeOutcome::failed(job.id, job.destination, ProbeFailure::run(&e))
            }
        };

        self.gateway.publish_result(outcome).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Destination, Event, RunStatus};
    use prober::{MockBehavior, MockProber};
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::sync::mpsc;

    use crate::queue::Handoff;

    fn settings() -> ProbeSettings {
        ProbeSettings {
            min_packet_num: 4,
            max_packet_num: 20,
            ping_timeout: 1,
            packet_interval_ms: 1,
        }
    }

    proptest! {
        #[test]
        fn packet_count_within_range(min in 1u32..100, span in 1u32..100, seed in any::<u64>()) {
            use rand::SeedableRng;
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            let count = sample_packet_count(&mut rng, min..min + span);
            prop_assert!(count >= min && count < min + span);
        }
    }

    #[test]
    fn test_packet_count_hits_both_ends() {
        let mut rng = rand::rng();
        let seen: HashSet<u32> = (0..2_000)
            .map(|_| sample_packet_count(&mut rng, 4..8))
            .collect();
        assert_eq!(seen, (4..8).collect());
    }

    #[test]
    fn test_packet_count_empty_range() {
        assert_eq!(sample_packet_count(&mut rand::rng(), 5..5), 5);
    }

    struct Harness {
        prober: MockProber,
        registry: Arc<ActiveProbes>,
        gateway: Arc<EventGateway>,
        jobs_tx: async_channel::Sender<Handoff>,
        pool: WorkerPool,
        events: mpsc::Receiver<Event>,
    }

    impl Harness {
        /// Queue a job and wait until a worker takes it
        async fn send(&self, address: &str) {
            let (handoff, accepted) = Handoff::new(job(address));
            self.jobs_tx.send(handoff).await.unwrap();
            accepted.await.unwrap();
        }
    }

    fn harness(size: usize, prober: MockProber) -> Harness {
        let (tx, events) = mpsc::channel(64);
        let gateway = Arc::new(EventGateway::new(tx));
        let registry = Arc::new(ActiveProbes::new());
        let (jobs_tx, jobs_rx) = async_channel::bounded(1);
        let pool = WorkerPool::spawn(
            size,
            Arc::new(prober.clone()),
            settings(),
            Arc::clone(&registry),
            Arc::clone(&gateway),
            JobReceiver::new(jobs_rx),
        );
        Harness {
            prober,
            registry,
            gateway,
            jobs_tx,
            pool,
            events,
        }
    }

    fn job(address: &str) -> Job {
        Job::new(Destination::new(address, address))
    }

    #[tokio::test]
    async fn test_one_result_per_job() {
        let mut h = harness(2, MockProber::new());
        h.gateway.start().await;
        assert_eq!(h.events.recv().await.unwrap().status(), Some(RunStatus::Running));

        for address in ["a", "b", "c"] {
            h.send(address).await;
        }
        h.jobs_tx.close();
        let snapshot = h.pool.join().await;
        assert_eq!(snapshot.completed, 3);

        let mut addresses = Vec::new();
        for _ in 0..3 {
            let event = h.events.recv().await.unwrap();
            addresses.push(event.outcome().unwrap().destination.address.clone());
        }
        addresses.sort();
        assert_eq!(addresses, vec!["a", "b", "c"]);
        assert!(h.registry.is_empty());

        for request in h.prober.requests() {
            assert!((4..20).contains(&request.packet_count));
            assert_eq!(request.timeout, Duration::from_secs(1));
        }
    }

    #[tokio::test]
    async fn test_construction_failure_reported() {
        let prober = MockProber::new()
            .with_behavior("bad", MockBehavior::FailConstruction("no addresses found".into()));
        let mut h = harness(1, prober);
        h.gateway.start().await;
        h.events.recv().await;

        h.send("bad").await;
        h.send("good").await;
        h.jobs_tx.close();
        let snapshot = h.pool.join().await;
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.completed, 1);

        let first = h.events.recv().await.unwrap();
        let failure = first.outcome().unwrap().failure().unwrap();
        assert_eq!(failure.kind, contracts::FailureKind::Construction);
        assert!(h.events.recv().await.unwrap().outcome().unwrap().is_success());
        assert_eq!(h.prober.started(), 1);
    }

    #[tokio::test]
    async fn test_run_failure_reported() {
        let prober = MockProber::new().with_default(MockBehavior::LoseAll);
        let mut h = harness(1, prober);
        h.gateway.start().await;
        h.events.recv().await;

        h.send("a").await;
        h.jobs_tx.close();
        h.pool.join().await;

        let event = h.events.recv().await.unwrap();
        let failure = event.outcome().unwrap().failure().unwrap();
        assert_eq!(failure.kind, contracts::FailureKind::Run);

        // All packets lost still reports what was sent
        let stats = failure.stats.as_ref().unwrap();
        assert_eq!(stats.packets_sent, h.prober.requests()[0].packet_count);
        assert_eq!(stats.packets_received, 0);
        assert!((stats.packet_loss_pct - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_pool_size() {
        let prober = MockProber::new().with_default(MockBehavior::Succeed {
            rtt: Duration::from_millis(1),
            delay: Duration::from_millis(30),
        });
        let h = harness(3, prober);
        h.gateway.start().await;

        for i in 0..12 {
            h.send(&format!("10.0.0.{i}")).await;
        }
        h.jobs_tx.close();
        let snapshot = h.pool.join().await;

        assert_eq!(snapshot.completed, 12);
        assert!(h.prober.peak_in_flight() <= 3);
        assert!(snapshot.peak_in_flight <= 3);
    }

    #[tokio::test]
    async fn test_cancelled_probe_publishes_nothing() {
        let prober = MockProber::new().with_default(MockBehavior::Hang);
        let mut h = harness(2, prober);
        h.gateway.start().await;
        h.events.recv().await;

        h.send("a").await;
        h.send("b").await;
        while h.registry.len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        assert_eq!(h.registry.cancel_all(), 2);
        h.jobs_tx.close();
        let snapshot = h.pool.join().await;

        assert_eq!(snapshot.cancelled, 2);
        assert!(h.registry.is_empty());
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_drained_job_after_seal_is_cancelled() {
        let prober = MockProber::new().with_default(MockBehavior::Hang);
        let h = harness(1, prober);
        h.gateway.start().await;

        h.registry.cancel_all();
        h.send("late").await;
        h.jobs_tx.close();

        let snapshot = tokio::time::timeout(Duration::from_secs(1), h.pool.join())
            .await
            .unwrap();
        assert_eq!(snapshot.cancelled, 1);
        assert!(h.registry.is_empty());
    }
}
