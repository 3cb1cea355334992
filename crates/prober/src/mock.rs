//! Mock probe executor
//!
//! Scripted per-address behaviour for tests and dry runs. Records every
//! request it receives and tracks how many sessions run at once.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use contracts::{
    ProbeCallbacks, ProbeError, ProbeExecutor, ProbeId, ProbeRequest, ProbeSession, ProbeStats,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// How a mock probe against one address behaves
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Every packet is answered after `rtt`; the run takes `delay` overall
    Succeed { rtt: Duration, delay: Duration },
    /// `create` fails with a resolve error
    FailConstruction(String),
    /// The run fails with this message
    FailRun(String),
    /// No packet is answered
    LoseAll,
    /// The run never finishes on its own, only through cancellation
    Hang,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self::Succeed {
            rtt: Duration::from_millis(5),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    started: AtomicU64,
    finished: AtomicU64,
    cancelled: AtomicU64,
    requests: Mutex<Vec<ProbeRequest>>,
}

/// Decrements `in_flight` when a run ends, however it ends
struct InFlightGuard<'a>(&'a MockState);

impl<'a> InFlightGuard<'a> {
    fn enter(state: &'a MockState) -> Self {
        let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        state.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        state.started.fetch_add(1, Ordering::SeqCst);
        Self(state)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock executor
///
/// Cloning shares the recorded state, so a test can keep a clone while the
/// pool owns the other.
#[derive(Debug, Clone, Default)]
pub struct MockProber {
    default_behavior: MockBehavior,
    behaviors: HashMap<String, MockBehavior>,
    next_id: Arc<AtomicU64>,
    state: Arc<MockState>,
}

impl MockProber {
    /// Every address succeeds immediately
    pub fn new() -> Self {
        Self::default()
    }

    /// Behaviour for addresses without an override
    pub fn with_default(mut self, behavior: MockBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    /// Override the behaviour for one address
    pub fn with_behavior(mut self, address: impl Into<String>, behavior: MockBehavior) -> Self {
        self.behaviors.insert(address.into(), behavior);
        self
    }

    fn behavior_for(&self, address: &str) -> MockBehavior {
        self.behaviors
            .get(address)
            .cloned()
            .unwrap_or_else(|| self.default_behavior.clone())
    }

    /// Sessions currently running
    pub fn in_flight(&self) -> usize {
        self.state.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of sessions that ran at once
    pub fn peak_in_flight(&self) -> usize {
        self.state.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Runs started
    pub fn started(&self) -> u64 {
        self.state.started.load(Ordering::SeqCst)
    }

    /// Runs that returned statistics or a run error
    pub fn finished(&self) -> u64 {
        self.state.finished.load(Ordering::SeqCst)
    }

    /// Runs stopped through their cancel token
    pub fn cancelled(&self) -> u64 {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Every request passed to `create`, in call order
    pub fn requests(&self) -> Vec<ProbeRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProbeExecutor for MockProber {
    type Session = MockSession;

    #[instrument(name = "mock_prober_create", skip(self, request), fields(address = %request.address))]
    async fn create(&self, request: ProbeRequest) -> Result<MockSession, ProbeError> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let behavior = self.behavior_for(&request.address);
        if let MockBehavior::FailConstruction(message) = &behavior {
            return Err(ProbeError::resolve(&request.address, message.clone()));
        }

        let id = ProbeId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(probe_id = %id, "mock session created");

        Ok(MockSession {
            id,
            request,
            behavior,
            cancel: CancellationToken::new(),
            state: Arc::clone(&self.state),
        })
    }
}

/// Mock session
#[derive(Debug)]
pub struct MockSession {
    id: ProbeId,
    request: ProbeRequest,
    behavior: MockBehavior,
    cancel: CancellationToken,
    state: Arc<MockState>,
}

impl MockSession {
    async fn execute(&self) -> Result<ProbeStats, ProbeError> {
        let count = self.request.packet_count;
        match &self.behavior {
            MockBehavior::Succeed { rtt, delay } => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(ProbeError::Cancelled),
                    _ = tokio::time::sleep(*delay) => {
                        let rtts = vec![*rtt; count as usize];
                        Ok(ProbeStats::from_rtts(count, &rtts))
                    }
                }
            }
            MockBehavior::FailRun(message) => Err(ProbeError::run(message.clone())),
            MockBehavior::LoseAll => Err(ProbeError::AllPacketsLost {
                sent: count,
                timeout: self.request.timeout,
            }),
            MockBehavior::Hang => {
                self.cancel.cancelled().await;
                Err(ProbeError::Cancelled)
            }
            // Rejected in create
            MockBehavior::FailConstruction(message) => Err(ProbeError::run(message.clone())),
        }
    }
}

impl ProbeSession for MockSession {
    fn probe_id(&self) -> ProbeId {
        self.id
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[instrument(name = "mock_session_run", skip(self, callbacks), fields(probe_id = %self.id))]
    async fn run(self, mut callbacks: ProbeCallbacks) -> Result<ProbeStats, ProbeError> {
        let _guard = InFlightGuard::enter(&self.state);
        callbacks.fire_start();

        let result = if self.cancel.is_cancelled() {
            Err(ProbeError::Cancelled)
        } else {
            self.execute().await
        };

        match &result {
            Ok(stats) => {
                self.state.finished.fetch_add(1, Ordering::SeqCst);
                callbacks.fire_finish(stats);
            }
            Err(e) if e.is_cancelled() => {
                self.state.cancelled.fetch_add(1, Ordering::SeqCst);
            }
            Err(_) => {
                self.state.finished.fetch_add(1, Ordering::SeqCst);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn request(address: &str, packet_count: u32) -> ProbeRequest {
        ProbeRequest {
            address: address.to_string(),
            packet_count,
            timeout: Duration::from_secs(1),
            packet_interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn test_default_succeeds() {
        let prober = MockProber::new();
        let session = prober.create(request("1.1.1.1", 4)).await.unwrap();

        let started = Arc::new(AtomicBool::new(false));
        let s = Arc::clone(&started);
        let callbacks = ProbeCallbacks::new().on_start(move || s.store(true, Ordering::SeqCst));

        let stats = session.run(callbacks).await.unwrap();
        assert_eq!(stats.packets_sent, 4);
        assert_eq!(stats.packets_received, 4);
        assert!(started.load(Ordering::SeqCst));
        assert_eq!(prober.finished(), 1);
        assert_eq!(prober.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_construction_failure() {
        let prober = MockProber::new().with_behavior(
            "bad.invalid",
            MockBehavior::FailConstruction("no addresses found".into()),
        );

        let err = prober.create(request("bad.invalid", 4)).await.err().unwrap();
        assert!(matches!(err, ProbeError::Resolve { .. }));
        assert_eq!(prober.requests().len(), 1);
        assert_eq!(prober.started(), 0);
    }

    #[tokio::test]
    async fn test_run_failure_skips_finish_callback() {
        let prober = MockProber::new().with_default(MockBehavior::FailRun("boom".into()));
        let session = prober.create(request("10.0.0.1", 4)).await.unwrap();

        let finished = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&finished);
        let callbacks = ProbeCallbacks::new().on_finish(move |_| f.store(true, Ordering::SeqCst));

        let err = session.run(callbacks).await.unwrap_err();
        assert_eq!(err, ProbeError::run("boom"));
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_hang_until_cancelled() {
        let prober = MockProber::new().with_default(MockBehavior::Hang);
        let session = prober.create(request("10.0.0.1", 4)).await.unwrap();
        let token = session.cancel_token();

        let handle = tokio::spawn(session.run(ProbeCallbacks::new()));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(prober.in_flight(), 1);

        token.cancel();
        let err = handle.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(prober.cancelled(), 1);
        assert_eq!(prober.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let prober = MockProber::new();
        let session = prober.create(request("10.0.0.1", 4)).await.unwrap();
        session.cancel_token().cancel();

        let err = session.run(ProbeCallbacks::new()).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_peak_in_flight() {
        let prober = MockProber::new().with_default(MockBehavior::Succeed {
            rtt: Duration::from_millis(1),
            delay: Duration::from_millis(50),
        });

        let mut handles = Vec::new();
        for i in 0..3 {
            let session = prober.create(request(&format!("10.0.0.{i}"), 4)).await.unwrap();
            handles.push(tokio::spawn(session.run(ProbeCallbacks::new())));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(prober.peak_in_flight(), 3);
        assert_eq!(prober.finished(), 3);
        assert_eq!(prober.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_unique_probe_ids() {
        let prober = MockProber::new();
        let a = prober.create(request("a", 4)).await.unwrap();
        let b = prober.clone().create(request("b", 4)).await.unwrap();
        assert_ne!(a.probe_id(), b.probe_id());
    }
}
