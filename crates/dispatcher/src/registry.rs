//! ActiveProbes - registry of running probes
//!
//! Holds one handle per executing probe so that shutdown can stop them all.

use std::collections::HashMap;

use contracts::ProbeId;
use metrics::gauge;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Stop handle of one executing probe
#[derive(Debug, Clone)]
pub struct ActiveProbeHandle {
    probe_id: ProbeId,
    address: String,
    token: CancellationToken,
}

impl ActiveProbeHandle {
    pub fn new(probe_id: ProbeId, address: impl Into<String>, token: CancellationToken) -> Self {
        Self {
            probe_id,
            address: address.into(),
            token,
        }
    }

    pub fn probe_id(&self) -> ProbeId {
        self.probe_id
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Stop the probe; no-op if it already stopped
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Default)]
struct RegistryState {
    probes: HashMap<ProbeId, ActiveProbeHandle>,
    /// Set by `cancel_all`; later registrations are refused
    sealed: bool,
}

/// Registry of executing probes
#[derive(Default)]
pub struct ActiveProbes {
    inner: Mutex<RegistryState>,
}

impl ActiveProbes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a probe that just started.
    ///
    /// After `cancel_all` the registration is refused, the handle is
    /// cancelled on the spot and false is returned.
    pub fn register(&self, handle: ActiveProbeHandle) -> bool {
        let mut state = self.inner.lock();
        if state.sealed {
            debug!(probe_id = %handle.probe_id, address = %handle.address, "registry sealed, cancelling probe");
            handle.cancel();
            return false;
        }
        state.probes.insert(handle.probe_id, handle);
        gauge!("pingboard_active_probes").set(state.probes.len() as f64);
        true
    }

    /// Forget a probe; no-op if it is not tracked
    pub fn deregister(&self, probe_id: ProbeId) -> Option<ActiveProbeHandle> {
        let mut state = self.inner.lock();
        let handle = state.probes.remove(&probe_id);
        if handle.is_some() {
            gauge!("pingboard_active_probes").set(state.probes.len() as f64);
        }
        handle
    }

    /// Stop and remove every tracked probe, then seal the registry.
    ///
    /// Returns the number of handles removed.
    pub fn cancel_all(&self) -> usize {
        let handles: Vec<ActiveProbeHandle> = {
            let mut state = self.inner.lock();
            state.sealed = true;
            state.probes.drain().map(|(_, handle)| handle).collect()
        };
        gauge!("pingboard_active_probes").set(0.0);

        for handle in &handles {
            if handle.is_cancelled() {
                debug!(probe_id = %handle.probe_id, address = %handle.address, "probe already stopped");
            }
            handle.cancel();
        }

        info!(cancelled = handles.len(), "active probes cancelled");
        handles.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().probes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.lock().sealed
    }

    pub fn contains(&self, probe_id: ProbeId) -> bool {
        self.inner.lock().probes.contains_key(&probe_id)
    }
}
