//! # Prober
//!
//! Probe executors for the monitor.
//!
//! Responsibilities:
//! - Resolve destination addresses
//! - Run ICMP echo probes and compute packet statistics
//! - Honour stop requests through the session cancel token
//! - Provide a scripted mock executor for tests without network access
//!
//! ## Feature Flags
//!
//! - `icmp`: Enable the real ICMP executor (requires surge-ping)

pub mod mock;
pub mod resolve;

#[cfg(feature = "icmp")]
pub mod icmp;

pub use contracts::{ProbeError, ProbeExecutor, ProbeRequest, ProbeSession, ProbeStats};
pub use mock::{MockBehavior, MockProber, MockSession};
pub use resolve::resolve_host;

#[cfg(feature = "icmp")]
pub use icmp::{IcmpProber, IcmpSession};
