//! EventGateway - serialized access to the event stream
//!
//! Owns the authoritative [`RunStatus`] and the sending side of the event
//! channel. Every send and the final close go through one lock, so a result
//! can never be emitted after `StatusChanged(Stopped)`.

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use contracts::{Event, ProbeOutcome, RunStatus};

struct GatewayState {
    /// `None` once closed, or when no sink is attached
    tx: Option<mpsc::Sender<Event>>,
    status: RunStatus,
}

impl GatewayState {
    async fn send(&mut self, event: Event) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        if tx.send(event).await.is_err() {
            warn!("event receiver dropped, closing gateway");
            self.tx = None;
            return false;
        }
        true
    }
}

/// Core side of the event sink boundary
pub struct EventGateway {
    state: Mutex<GatewayState>,
}

impl EventGateway {
    /// Gateway publishing to `tx`
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        Self::with_sender(Some(tx))
    }

    /// Gateway without a sink: status still changes, emission is a no-op
    pub fn disabled() -> Self {
        Self::with_sender(None)
    }

    fn with_sender(tx: Option<mpsc::Sender<Event>>) -> Self {
        Self {
            state: Mutex::new(GatewayState {
                tx,
                status: RunStatus::NotStarted,
            }),
        }
    }

    /// Current run status
    pub async fn status(&self) -> RunStatus {
        self.state.lock().await.status
    }

    /// Whether the event channel has been closed (or was never attached)
    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.tx.is_none()
    }

    /// `NotStarted -> Running`, then publish `StatusChanged(Running)`.
    ///
    /// Returns false if the gateway was not in `NotStarted`.
    pub async fn start(&self) -> bool {
        let mut state = self.state.lock().await;
        if !state.status.can_transition_to(RunStatus::Running) {
            warn!(status = %state.status, "gateway already started");
            return false;
        }
        state.status = RunStatus::Running;
        state.send(Event::StatusChanged(RunStatus::Running)).await;
        true
    }

    /// `Running -> Stopped` without publishing.
    ///
    /// From here on `publish_result` is a no-op.
    pub async fn mark_stopped(&self) {
        let mut state = self.state.lock().await;
        if state.status.can_transition_to(RunStatus::Stopped) {
            state.status = RunStatus::Stopped;
        }
    }

    /// Publish one probe outcome.
    ///
    /// No-op unless the status is `Running` and the channel is open.
    pub async fn publish_result(&self, outcome: ProbeOutcome) -> bool {
        let mut state = self.state.lock().await;
        if state.status != RunStatus::Running {
            debug!(job_id = %outcome.job_id, status = %state.status, "result discarded");
            return false;
        }
        state.send(Event::ResultRecorded(outcome)).await
    }

    /// Publish the terminal status event and close the channel.
    ///
    /// Both happen under the same lock. A second call is a no-op.
    pub async fn finish(&self) {
        let mut state = self.state.lock().await;
        if state.tx.is_none() {
            return;
        }
        let status = state.status;
        state.send(Event::StatusChanged(status)).await;
        state.tx = None;
        debug!(status = %status, "event channel closed");
    }
}
