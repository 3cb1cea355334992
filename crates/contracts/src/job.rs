//! Job - Producer output
//!
//! One job is one probe attempt against one destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Destination;

/// Job identifier
pub type JobId = Uuid;

/// A single probe attempt, never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Destination to probe
    pub destination: Destination,

    /// When the producer created the job
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Create a job for `destination` stamped now
    pub fn new(destination: Destination) -> Self {
        Self {
            id: Uuid::new_v4(),
            destination,
            created_at: Utc::now(),
        }
    }

    /// Destination address (identity key)
    pub fn address(&self) -> &str {
        &self.destination.address
    }
}
