//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the monitor:
//! destinations, jobs, run status, probe outcomes, pipeline events and the
//! traits at the probe-executor and event-sink boundaries.
//! All business crates depend on this crate only, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Wall-clock timestamps (`chrono::DateTime<Utc>`) mark job creation and result recording
//! - Round-trip times are `std::time::Duration`

mod blueprint;
mod error;
mod event;
mod job;
mod outcome;
mod probe;
mod sink;
mod status;

pub use blueprint::*;
pub use error::*;
pub use event::Event;
pub use job::{Job, JobId};
pub use outcome::*;
pub use probe::*;
pub use sink::*;
pub use status::RunStatus;
