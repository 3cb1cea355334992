//! MonitorBlueprint - Config Loader output
//!
//! Describes a complete monitoring run: destinations, probe parameters,
//! pipeline sizing and logging outputs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Destinations probed on every cycle, in this order
    pub destinations: Vec<Destination>,

    /// Per-probe parameters
    #[serde(default)]
    pub probe: ProbeSettings,

    /// Producer / worker pool sizing
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Log outputs
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A probed network destination.
///
/// Identity is the `address`; `name` is for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    /// Display name
    pub name: String,

    /// Hostname or IP literal
    #[serde(alias = "ip")]
    pub address: String,

    /// Free-form labels attached to every log line and result of this destination
    #[serde(default)]
    pub labels: BTreeMap<String, serde_json::Value>,
}

impl Destination {
    /// Create a destination without labels
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            labels: BTreeMap::new(),
        }
    }

    /// Attach a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Largest allowed `max_packet_num`: one probe never sends more echo
/// requests than there are 16-bit ICMP sequence numbers
pub const MAX_PACKET_NUM: u32 = 1 << 16;

/// Probe parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// Lower bound (inclusive) of the per-job packet count
    #[serde(default = "default_min_packet_num")]
    pub min_packet_num: u32,

    /// Upper bound (exclusive) of the per-job packet count
    #[serde(default = "default_max_packet_num")]
    pub max_packet_num: u32,

    /// Seconds to wait for each echo reply
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,

    /// Milliseconds between two echo requests of the same probe
    #[serde(default = "default_packet_interval_ms")]
    pub packet_interval_ms: u64,
}

impl ProbeSettings {
    /// Half-open packet count range `[min_packet_num, max_packet_num)`
    pub fn packet_range(&self) -> Range<u32> {
        self.min_packet_num..self.max_packet_num
    }

    /// Per-packet reply timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout)
    }

    /// Spacing between echo requests
    pub fn packet_interval(&self) -> Duration {
        Duration::from_millis(self.packet_interval_ms)
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            min_packet_num: default_min_packet_num(),
            max_packet_num: default_max_packet_num(),
            ping_timeout: default_ping_timeout(),
            packet_interval_ms: default_packet_interval_ms(),
        }
    }
}

/// Pipeline sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Seconds slept by the producer between two passes
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,

    /// Number of concurrent probe workers
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Capacity of the event channel towards the sinks
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl PipelineSettings {
    /// Producer sleep between passes
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            ping_interval: default_ping_interval(),
            worker_pool_size: default_worker_pool_size(),
            event_buffer: default_event_buffer(),
        }
    }
}

/// Log outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write JSON log lines to `file_output` and `debug_output`
    #[serde(default)]
    pub file_enabled: bool,

    /// Log to stdout
    #[serde(default = "default_console_enabled")]
    pub console_enabled: bool,

    /// NDJSON results log: INFO and ERROR events
    #[serde(default = "default_file_output")]
    pub file_output: PathBuf,

    /// NDJSON debug log: DEBUG and WARN events
    #[serde(default = "default_debug_output")]
    pub debug_output: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file_enabled: false,
            console_enabled: default_console_enabled(),
            file_output: default_file_output(),
            debug_output: default_debug_output(),
        }
    }
}

fn default_min_packet_num() -> u32 {
    4
}

fn default_max_packet_num() -> u32 {
    20
}

fn default_ping_timeout() -> u64 {
    30
}

fn default_packet_interval_ms() -> u64 {
    1000
}

fn default_ping_interval() -> u64 {
    30
}

fn default_worker_pool_size() -> usize {
    5
}

fn default_event_buffer() -> usize {
    64
}

fn default_console_enabled() -> bool {
    true
}

fn default_file_output() -> PathBuf {
    PathBuf::from("logs/results.ndjson")
}

fn default_debug_output() -> PathBuf {
    PathBuf::from("logs/debug.ndjson")
}
