//! # Ingestion
//!
//! Job production module.
//!
//! Responsibilities:
//! - Turn the destination list into one `Job` per destination per pass
//! - Pace passes by the configured ping interval
//! - Hand jobs to the dispatcher with backpressure
//! - Stop promptly on cancellation or when the dispatcher closes
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::Producer;
//!
//! let (submitter, dispatcher, jobs) = dispatcher::channels(gateway, registry);
//! let producer = Producer::new(blueprint.destinations, interval, submitter);
//! let handle = producer.spawn(cancel.clone());
//! ```

mod producer;

// Re-exports
pub use contracts::{Destination, Job};
pub use producer::{Producer, ProducerStats, StopReason};
