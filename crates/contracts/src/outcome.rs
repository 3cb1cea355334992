//! ProbeOutcome - Worker output
//!
//! Statistics or failure of one finished job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{Destination, JobId, ProbeError};

/// Packet statistics of one probe
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeStats {
    /// Echo requests sent
    pub packets_sent: u32,

    /// Echo replies received
    pub packets_received: u32,

    /// Lost packets, percent of sent (0-100)
    pub packet_loss_pct: f64,

    pub min_rtt: Duration,
    pub avg_rtt: Duration,
    pub max_rtt: Duration,

    /// Population standard deviation of the round-trip times
    pub stddev_rtt: Duration,
}

impl ProbeStats {
    /// Build statistics from the round-trip times of the replies received
    pub fn from_rtts(packets_sent: u32, rtts: &[Duration]) -> Self {
        let packets_received = rtts.len() as u32;
        let packet_loss_pct = if packets_sent == 0 {
            0.0
        } else {
            let lost = packets_sent.saturating_sub(packets_received);
            f64::from(lost) * 100.0 / f64::from(packets_sent)
        };

        if rtts.is_empty() {
            return Self {
                packets_sent,
                packets_received,
                packet_loss_pct,
                ..Default::default()
            };
        }

        let min_rtt = rtts.iter().copied().min().unwrap_or_default();
        let max_rtt = rtts.iter().copied().max().unwrap_or_default();
        let count = rtts.len() as f64;
        let mean = rtts.iter().map(Duration::as_secs_f64).sum::<f64>() / count;
        let variance = rtts
            .iter()
            .map(|rtt| (rtt.as_secs_f64() - mean).powi(2))
            .sum::<f64>()
            / count;

        Self {
            packets_sent,
            packets_received,
            packet_loss_pct,
            min_rtt,
            avg_rtt: Duration::from_secs_f64(mean),
            max_rtt,
            stddev_rtt: Duration::from_secs_f64(variance.sqrt()),
        }
    }
}

/// Stage at which a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Probe could not be created (e.g. unresolvable host)
    Construction,
    /// Probe ran but reported an error instead of statistics
    Run,
}

/// Failure reason carried by a result event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub kind: FailureKind,
    pub message: String,

    /// Packet statistics gathered before the failure, when the probe got
    /// far enough to send anything
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ProbeStats>,
}

impl ProbeFailure {
    pub fn construction(err: &ProbeError) -> Self {
        Self {
            kind: FailureKind::Construction,
            message: err.to_string(),
            stats: None,
        }
    }

    /// Run failure; an all-packets-lost run keeps its send count and 100% loss
    pub fn run(err: &ProbeError) -> Self {
        let stats = match err {
            ProbeError::AllPacketsLost { sent, .. } => Some(ProbeStats::from_rtts(*sent, &[])),
            _ => None,
        };
        Self {
            kind: FailureKind::Run,
            message: err.to_string(),
            stats,
        }
    }
}

/// Statistics or failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeResult {
    Completed(ProbeStats),
    Failed(ProbeFailure),
}

/// Outcome of one job, produced exactly once per completed or failed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// Job this outcome belongs to
    pub job_id: JobId,

    /// Probed destination
    pub destination: Destination,

    /// Statistics or failure reason
    pub result: ProbeResult,

    /// When the worker recorded the outcome
    pub recorded_at: DateTime<Utc>,
}

impl ProbeOutcome {
    /// Successful probe
    pub fn completed(job_id: JobId, destination: Destination, stats: ProbeStats) -> Self {
        Self {
            job_id,
            destination,
            result: ProbeResult::Completed(stats),
            recorded_at: Utc::now(),
        }
    }

    /// Failed probe
    pub fn failed(job_id: JobId, destination: Destination, failure: ProbeFailure) -> Self {
        Self {
            job_id,
            destination,
            result: ProbeResult::Failed(failure),
            recorded_at: Utc::now(),
        }
    }

    /// Statistics of a completed probe, or those a failed run kept
    pub fn stats(&self) -> Option<&ProbeStats> {
        match &self.result {
            ProbeResult::Completed(stats) => Some(stats),
            ProbeResult::Failed(failure) => failure.stats.as_ref(),
        }
    }

    /// Failure, if the probe failed
    pub fn failure(&self) -> Option<&ProbeFailure> {
        match &self.result {
            ProbeResult::Completed(_) => None,
            ProbeResult::Failed(failure) => Some(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, ProbeResult::Completed(_))
    }
}
