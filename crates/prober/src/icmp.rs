//! ICMP echo executor
//!
//! One surge-ping client per session. The session sends `packet_count` echo
//! requests spaced by `packet_interval`, each waiting at most `timeout` for
//! its reply, and races every wait against the cancel token.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use contracts::{
    ProbeCallbacks, ProbeError, ProbeExecutor, ProbeId, ProbeRequest, ProbeSession, ProbeStats,
    MAX_PACKET_NUM,
};
use surge_ping::{Client, Config, PingIdentifier, PingSequence, SurgeError, ICMP};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace};

use crate::resolve::resolve_host;

/// Echo payload size, same as the classic `ping` default
const PAYLOAD_SIZE: usize = 56;

/// Real ICMP probe executor
#[derive(Debug, Default)]
pub struct IcmpProber {
    next_id: AtomicU64,
}

impl IcmpProber {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> ProbeId {
        ProbeId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl ProbeExecutor for IcmpProber {
    type Session = IcmpSession;

    #[instrument(
        name = "icmp_prober_create",
        skip(self, request),
        fields(address = %request.address, packet_count = request.packet_count)
    )]
    async fn create(&self, request: ProbeRequest) -> Result<IcmpSession, ProbeError> {
        if request.packet_count == 0 {
            return Err(ProbeError::InvalidRequest {
                message: "packet_count must be > 0".into(),
            });
        }
        if request.packet_count > MAX_PACKET_NUM {
            return Err(ProbeError::InvalidRequest {
                message: format!("packet_count must be <= {MAX_PACKET_NUM}"),
            });
        }

        let ip = resolve_host(&request.address)
            .await
            .map_err(|e| ProbeError::resolve(&request.address, e.to_string()))?;

        let config = match ip {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client = Client::new(&config).map_err(|e| ProbeError::Socket {
            message: e.to_string(),
        })?;

        let id = self.allocate_id();
        debug!(probe_id = %id, ip = %ip, "ICMP session created");

        Ok(IcmpSession {
            id,
            ip,
            client,
            request,
            cancel: CancellationToken::new(),
        })
    }
}

/// One ICMP probe against a resolved address
pub struct IcmpSession {
    id: ProbeId,
    ip: IpAddr,
    client: Client,
    request: ProbeRequest,
    cancel: CancellationToken,
}

impl ProbeSession for IcmpSession {
    fn probe_id(&self) -> ProbeId {
        self.id
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[instrument(
        name = "icmp_session_run",
        skip(self, callbacks),
        fields(probe_id = %self.id, ip = %self.ip, packet_count = self.request.packet_count)
    )]
    async fn run(self, mut callbacks: ProbeCallbacks) -> Result<ProbeStats, ProbeError> {
        let mut pinger = self.client.pinger(self.ip, PingIdentifier(rand::random())).await;
        pinger.timeout(self.request.timeout);

        callbacks.fire_start();

        let payload = [0u8; PAYLOAD_SIZE];
        let mut rtts: Vec<Duration> = Vec::new();
        let mut sent = 0u32;

        for seq in 0..self.request.packet_count {
            if seq > 0 {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(ProbeError::Cancelled),
                    _ = tokio::time::sleep(self.request.packet_interval) => {}
                }
            }

            sent += 1;
            let reply = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(ProbeError::Cancelled),
                reply = pinger.ping(PingSequence(seq as u16), &payload) => reply,
            };

            match reply {
                Ok((_, rtt)) => {
                    trace!(seq, rtt_ms = rtt.as_secs_f64() * 1000.0, "echo reply");
                    rtts.push(rtt);
                }
                Err(SurgeError::Timeout { .. }) => {
                    trace!(seq, "echo timed out");
                }
                Err(e) => {
                    debug!(seq, error = %e, "echo failed");
                    return Err(ProbeError::run(e.to_string()));
                }
            }
        }

        let stats = ProbeStats::from_rtts(sent, &rtts);
        callbacks.fire_finish(&stats);

        if stats.packets_received == 0 {
            return Err(ProbeError::AllPacketsLost {
                sent,
                timeout: self.request.timeout,
            });
        }
        Ok(stats)
    }
}
