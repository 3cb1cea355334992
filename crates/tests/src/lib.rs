//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 基于 MockProber 的 e2e 测试（无需 ICMP 权限）
//! - 关闭顺序与并发上限回归

#[cfg(test)]
mod contract_tests {
    use contracts::{Destination, Event, JobId, ProbeOutcome, ProbeStats, RunStatus};
    use std::time::Duration;

    #[test]
    fn test_contracts_compile() {
        // 验证 contracts crate 可编译
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_event_wire_shape() {
        let status = serde_json::to_value(Event::StatusChanged(RunStatus::Running)).unwrap();
        assert_eq!(status, serde_json::json!({ "type": "status_changed", "data": "running" }));

        let stats = ProbeStats::from_rtts(4, &[Duration::from_millis(10); 2]);
        let outcome = ProbeOutcome::completed(
            JobId::new_v4(),
            Destination::new("dns", "1.1.1.1").with_label("site", "edge"),
            stats,
        );
        let value = serde_json::to_value(Event::ResultRecorded(outcome)).unwrap();
        assert_eq!(value["type"], "result_recorded");
        assert_eq!(value["data"]["destination"]["labels"]["site"], "edge");
    }

    #[test]
    fn test_config_round_trip_through_loader() {
        let toml = r#"
[[destinations]]
name = "dns"
ip = "1.1.1.1"

[[destinations]]
name = "gateway"
address = "192.168.1.1"
labels = { rack = "a1" }

[probe]
min_packet_num = 2
max_packet_num = 5

[pipeline]
worker_pool_size = 2
"#;
        let blueprint =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        let json = config_loader::ConfigLoader::to_json(&blueprint).unwrap();
        let reloaded =
            config_loader::ConfigLoader::load_from_str(&json, config_loader::ConfigFormat::Json)
                .unwrap();

        assert_eq!(reloaded.destinations, blueprint.destinations);
        assert_eq!(reloaded.probe.packet_range(), 2..5);
        assert_eq!(reloaded.pipeline.worker_pool_size, 2);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        Destination, Event, FailureKind, ProbeResult, ProbeSettings, RunStatus,
    };
    use dispatcher::{
        channels, ActiveProbes, DispatcherReport, EventGateway, PoolMetricsSnapshot, WorkerPool,
    };
    use ingestion::{Producer, ProducerStats};
    use prober::{MockBehavior, MockProber};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tokio_util::sync::CancellationToken;

    const SHUTDOWN_BOUND: Duration = Duration::from_secs(2);

    /// Producer + dispatcher + worker pool wired to a raw event channel
    struct Harness {
        events: mpsc::Receiver<Event>,
        cancel: CancellationToken,
        registry: Arc<ActiveProbes>,
        producer: JoinHandle<ProducerStats>,
        dispatcher: JoinHandle<DispatcherReport>,
        pool: WorkerPool,
    }

    struct Shutdown {
        trailing: Vec<Event>,
        report: DispatcherReport,
        pool: PoolMetricsSnapshot,
        producer: ProducerStats,
    }

    fn destinations(addresses: &[&str]) -> Vec<Destination> {
        addresses
            .iter()
            .map(|address| Destination::new(format!("dest-{address}"), *address))
            .collect()
    }

    fn settings() -> ProbeSettings {
        ProbeSettings {
            min_packet_num: 2,
            max_packet_num: 6,
            ..ProbeSettings::default()
        }
    }

    impl Harness {
        fn start(
            destinations: Vec<Destination>,
            pool_size: usize,
            interval: Duration,
            prober: MockProber,
        ) -> Self {
            let (tx, events) = mpsc::channel(64);
            let gateway = Arc::new(EventGateway::new(tx));
            let registry = Arc::new(ActiveProbes::new());
            let cancel = CancellationToken::new();

            let (submitter, dispatcher, jobs) =
                channels(Arc::clone(&gateway), Arc::clone(&registry));
            let pool = WorkerPool::spawn(
                pool_size,
                Arc::new(prober),
                settings(),
                Arc::clone(&registry),
                gateway,
                jobs,
            );
            let dispatcher = dispatcher.spawn(cancel.clone());
            let producer = Producer::new(destinations, interval, submitter).spawn(cancel.clone());

            Self {
                events,
                cancel,
                registry,
                producer,
                dispatcher,
                pool,
            }
        }

        async fn next_event(&mut self) -> Event {
            tokio::time::timeout(SHUTDOWN_BOUND, self.events.recv())
                .await
                .expect("timed out waiting for an event")
                .expect("event stream closed early")
        }

        /// Read events until `count` results arrived
        async fn results(&mut self, count: usize) -> Vec<Event> {
            let mut seen = Vec::new();
            let mut results = 0;
            while results < count {
                let event = self.next_event().await;
                if event.outcome().is_some() {
                    results += 1;
                }
                seen.push(event);
            }
            seen
        }

        /// Cancel, then wait for every task and the end of the event stream
        async fn shutdown(mut self) -> Shutdown {
            self.cancel.cancel();

            let stream = async {
                let mut trailing = Vec::new();
                while let Some(event) = self.events.recv().await {
                    trailing.push(event);
                }
                trailing
            };
            let trailing = tokio::time::timeout(SHUTDOWN_BOUND, stream)
                .await
                .expect("event stream did not close");
            let report = tokio::time::timeout(SHUTDOWN_BOUND, self.dispatcher)
                .await
                .expect("dispatcher did not stop")
                .unwrap();
            assert!(self.registry.is_empty());
            assert!(self.registry.is_sealed());

            let pool = tokio::time::timeout(SHUTDOWN_BOUND, self.pool.join())
                .await
                .expect("workers did not stop");
            let producer = tokio::time::timeout(SHUTDOWN_BOUND, self.producer)
                .await
                .expect("producer did not stop")
                .unwrap();

            Shutdown {
                trailing,
                report,
                pool,
                producer,
            }
        }
    }

    async fn wait_for_in_flight(prober: &MockProber, expected: usize) {
        tokio::time::timeout(SHUTDOWN_BOUND, async {
            while prober.in_flight() < expected {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("probes did not start");
    }

    /// 3 destinations, pool of 2, 1s interval: one full cycle then shutdown
    #[tokio::test]
    async fn test_e2e_one_cycle() {
        let prober = MockProber::new().with_default(MockBehavior::Succeed {
            rtt: Duration::from_millis(3),
            delay: Duration::from_millis(10),
        });
        let mut harness = Harness::start(
            destinations(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]),
            2,
            Duration::from_secs(1),
            prober.clone(),
        );

        assert_eq!(harness.next_event().await, Event::StatusChanged(RunStatus::Running));
        let events = harness.results(3).await;
        let shutdown = harness.shutdown().await;

        // Exactly one result per destination
        let addresses: HashSet<String> = events
            .iter()
            .filter_map(|e| e.outcome())
            .map(|o| o.destination.address.clone())
            .collect();
        assert_eq!(addresses.len(), 3);
        assert!(events.iter().filter_map(|e| e.outcome()).all(|o| o.is_success()));

        // Stopped is the last event and the stream closed after it
        assert_eq!(shutdown.trailing, vec![Event::StatusChanged(RunStatus::Stopped)]);
        assert_eq!(shutdown.producer.jobs_submitted, 3);
        assert_eq!(shutdown.pool.completed, 3);
        assert_eq!(shutdown.report.probes_cancelled, 0);
    }

    #[tokio::test]
    async fn test_packet_counts_within_bounds() {
        let prober = MockProber::new();
        let mut harness = Harness::start(
            destinations(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4"]),
            2,
            Duration::from_millis(1),
            prober.clone(),
        );
        harness.results(40).await;
        harness.shutdown().await;

        let range = settings().packet_range();
        let requests = prober.requests();
        assert!(requests.len() >= 40);
        assert!(requests.iter().all(|r| range.contains(&r.packet_count)));
    }

    #[tokio::test]
    async fn test_in_flight_never_exceeds_pool_size() {
        let prober = MockProber::new().with_default(MockBehavior::Succeed {
            rtt: Duration::from_millis(1),
            delay: Duration::from_millis(15),
        });
        let addresses: Vec<String> = (1..=10).map(|i| format!("10.0.1.{i}")).collect();
        let addresses: Vec<&str> = addresses.iter().map(String::as_str).collect();
        let mut harness =
            Harness::start(destinations(&addresses), 3, Duration::from_secs(60), prober.clone());

        harness.results(10).await;
        let shutdown = harness.shutdown().await;

        assert!(prober.peak_in_flight() <= 3);
        assert!(shutdown.pool.peak_in_flight <= 3);
        assert_eq!(shutdown.pool.completed, 10);
    }

    #[tokio::test]
    async fn test_unresolvable_destination_does_not_stall_others() {
        let prober = MockProber::new().with_behavior(
            "does-not-exist.invalid",
            MockBehavior::FailConstruction("no such host".into()),
        );
        let mut harness = Harness::start(
            destinations(&["10.0.0.1", "does-not-exist.invalid", "10.0.0.3"]),
            1,
            Duration::from_secs(60),
            prober,
        );

        let events = harness.results(3).await;
        harness.shutdown().await;

        let outcomes: Vec<_> = events.iter().filter_map(|e| e.outcome()).collect();
        assert_eq!(outcomes.len(), 3);
        for outcome in outcomes {
            match (&outcome.result, outcome.destination.address.as_str()) {
                (ProbeResult::Failed(failure), "does-not-exist.invalid") => {
                    assert_eq!(failure.kind, FailureKind::Construction);
                }
                (ProbeResult::Completed(_), _) => {}
                (result, address) => panic!("unexpected result for {address}: {result:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_shutdown_with_no_probe_started() {
        let prober = MockProber::new();
        let harness = Harness::start(
            destinations(&["10.0.0.1"]),
            2,
            Duration::from_secs(60),
            prober,
        );

        let shutdown = harness.shutdown().await;
        assert_eq!(shutdown.report.probes_cancelled, 0);
        assert_eq!(
            shutdown.trailing.last(),
            Some(&Event::StatusChanged(RunStatus::Stopped))
        );
    }

    #[tokio::test]
    async fn test_cancel_mid_probe() {
        let prober = MockProber::new().with_default(MockBehavior::Hang);
        let mut harness = Harness::start(
            destinations(&["10.0.0.1"]),
            2,
            Duration::from_secs(60),
            prober.clone(),
        );
        assert_eq!(harness.next_event().await, Event::StatusChanged(RunStatus::Running));
        wait_for_in_flight(&prober, 1).await;

        let shutdown = harness.shutdown().await;

        assert_eq!(shutdown.report.probes_cancelled, 1);
        assert_eq!(shutdown.trailing, vec![Event::StatusChanged(RunStatus::Stopped)]);
        assert_eq!(shutdown.pool.cancelled, 1);
        assert_eq!(prober.cancelled(), 1);
        assert_eq!(prober.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_with_more_probes_than_workers() {
        let prober = MockProber::new().with_default(MockBehavior::Hang);
        let mut harness = Harness::start(
            destinations(&["10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"]),
            2,
            Duration::from_secs(60),
            prober.clone(),
        );
        assert_eq!(harness.next_event().await, Event::StatusChanged(RunStatus::Running));
        wait_for_in_flight(&prober, 2).await;

        let shutdown = harness.shutdown().await;

        // Only the two running probes were registered; queued jobs never publish
        assert_eq!(shutdown.report.probes_cancelled, 2);
        assert_eq!(shutdown.pool.completed, 0);
        assert_eq!(shutdown.pool.failed, 0);
        assert_eq!(shutdown.trailing, vec![Event::StatusChanged(RunStatus::Stopped)]);
        assert_eq!(shutdown.report.jobs_forwarded, 2);
        assert_eq!(shutdown.pool.jobs_received, 2);
        assert_eq!(prober.in_flight(), 0);
        assert!(prober.peak_in_flight() <= 2);
    }

    #[tokio::test]
    async fn test_busy_worker_holds_back_producer() {
        let prober = MockProber::new().with_default(MockBehavior::Hang);
        let addresses: Vec<String> = (1..=6).map(|i| format!("10.0.2.{i}")).collect();
        let addresses: Vec<&str> = addresses.iter().map(String::as_str).collect();
        let mut harness =
            Harness::start(destinations(&addresses), 1, Duration::from_secs(60), prober.clone());
        assert_eq!(harness.next_event().await, Event::StatusChanged(RunStatus::Running));
        wait_for_in_flight(&prober, 1).await;
        tokio::time::sleep(Duration::from_millis(200)).await;

        let shutdown = harness.shutdown().await;

        // One job running, one held by the dispatcher, one waiting to enter
        assert_eq!(shutdown.producer.jobs_submitted, 2);
        assert_eq!(shutdown.report.jobs_forwarded, 1);
        assert_eq!(shutdown.report.jobs_abandoned, 2);
        assert_eq!(shutdown.pool.jobs_received, 1);
        assert_eq!(shutdown.report.probes_cancelled, 1);
        assert_eq!(prober.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_results_racing_shutdown_end_before_stopped() {
        let addresses: Vec<String> = (1..=8).map(|i| format!("10.0.3.{i}")).collect();
        let addresses: Vec<&str> = addresses.iter().map(String::as_str).collect();

        // Probes finish right around the moment shutdown starts
        for delay_ms in [20u64, 25, 30, 35, 40] {
            let prober = MockProber::new().with_default(MockBehavior::Succeed {
                rtt: Duration::from_millis(1),
                delay: Duration::from_millis(delay_ms),
            });
            let mut harness = Harness::start(
                destinations(&addresses),
                addresses.len(),
                Duration::from_secs(60),
                prober.clone(),
            );
            assert_eq!(harness.next_event().await, Event::StatusChanged(RunStatus::Running));
            tokio::time::sleep(Duration::from_millis(30)).await;

            let shutdown = harness.shutdown().await;

            assert_eq!(
                shutdown.trailing.last(),
                Some(&Event::StatusChanged(RunStatus::Stopped)),
                "delay {delay_ms}ms"
            );
            let stops = shutdown.trailing.iter().filter(|e| e.status().is_some()).count();
            assert_eq!(stops, 1, "delay {delay_ms}ms");

            let results = shutdown.trailing.iter().filter(|e| e.outcome().is_some()).count();
            assert!(results as u64 <= shutdown.pool.completed);
            assert_eq!(
                shutdown.pool.completed + shutdown.pool.cancelled,
                shutdown.pool.jobs_received
            );
            assert_eq!(shutdown.pool.jobs_received, shutdown.report.jobs_forwarded);
            assert_eq!(prober.in_flight(), 0);
        }
    }
}
