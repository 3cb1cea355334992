//! Probe executor boundary
//!
//! Defines the request/response contract of the capability that performs one
//! reachability measurement. Workers only depend on these traits; the ICMP
//! implementation and the scripted mock live in the `prober` crate.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{ProbeError, ProbeStats};

/// Probe-scoped identifier, unique among the probes of one executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProbeId(pub u64);

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe-{}", self.0)
    }
}

/// Parameters of one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// Hostname or IP literal
    pub address: String,

    /// Number of echo requests to send
    pub packet_count: u32,

    /// Wait for each reply, not for the whole probe
    pub timeout: Duration,

    /// Spacing between echo requests
    pub packet_interval: Duration,
}

/// Fired once when the probe begins
pub type ProbeStartCallback = Box<dyn FnOnce() + Send>;

/// Fired once when the probe completes, with its final statistics
pub type ProbeFinishCallback = Box<dyn FnOnce(&ProbeStats) + Send>;

/// Lifecycle callbacks handed to [`ProbeSession::run`]
#[derive(Default)]
pub struct ProbeCallbacks {
    on_start: Option<ProbeStartCallback>,
    on_finish: Option<ProbeFinishCallback>,
}

impl ProbeCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_start = Some(Box::new(callback));
        self
    }

    pub fn on_finish(mut self, callback: impl FnOnce(&ProbeStats) + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(callback));
        self
    }

    /// Invoke the start callback; later calls are no-ops
    pub fn fire_start(&mut self) {
        if let Some(callback) = self.on_start.take() {
            callback();
        }
    }

    /// Invoke the finish callback; later calls are no-ops
    pub fn fire_finish(&mut self, stats: &ProbeStats) {
        if let Some(callback) = self.on_finish.take() {
            callback(stats);
        }
    }
}

impl fmt::Debug for ProbeCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_finish", &self.on_finish.is_some())
            .finish()
    }
}

/// Probe executor trait
///
/// Creates one session per job. Construction may fail (e.g. unresolvable
/// host); such failures are reported without a session ever starting.
pub trait ProbeExecutor: Send + Sync + 'static {
    /// Session type produced by this executor
    type Session: ProbeSession;

    /// Create a probe for `request`
    ///
    /// # Errors
    /// Returns a construction error (`Resolve`, `Socket`, `InvalidRequest`)
    fn create(
        &self,
        request: ProbeRequest,
    ) -> impl Future<Output = Result<Self::Session, ProbeError>> + Send;
}

/// One constructed, not yet started probe
pub trait ProbeSession: Send + 'static {
    /// Probe-scoped identifier
    fn probe_id(&self) -> ProbeId;

    /// Token that stops the run when cancelled.
    ///
    /// Cancelling after the run finished is a no-op.
    fn cancel_token(&self) -> CancellationToken;

    /// Run the probe to completion.
    ///
    /// Fires `on_start` once the probe begins and `on_finish` once it
    /// completes with statistics. Returns `ProbeError::Cancelled` when stopped
    /// through the cancel token.
    fn run(
        self,
        callbacks: ProbeCallbacks,
    ) -> impl Future<Output = Result<ProbeStats, ProbeError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_callbacks_fire_once() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&started);
        let f = Arc::clone(&finished);
        let mut callbacks = ProbeCallbacks::new()
            .on_start(move || {
                s.fetch_add(1, Ordering::SeqCst);
            })
            .on_finish(move |_| {
                f.fetch_add(1, Ordering::SeqCst);
            });

        callbacks.fire_start();
        callbacks.fire_start();
        callbacks.fire_finish(&ProbeStats::default());
        callbacks.fire_finish(&ProbeStats::default());

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_probe_id_display() {
        assert_eq!(ProbeId(7).to_string(), "probe-7");
    }
}
