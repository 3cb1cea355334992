//! Event - core output consumed by sinks

use serde::{Deserialize, Serialize};

use crate::{ProbeOutcome, RunStatus};

/// Event delivered on the ordered sink stream.
///
/// `StatusChanged(Running)` precedes every `ResultRecorded` and
/// `StatusChanged(Stopped)` is always the last event of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Event {
    StatusChanged(RunStatus),
    ResultRecorded(ProbeOutcome),
}

impl Event {
    /// Status carried by a status event
    pub fn status(&self) -> Option<RunStatus> {
        match self {
            Event::StatusChanged(status) => Some(*status),
            Event::ResultRecorded(_) => None,
        }
    }

    /// Outcome carried by a result event
    pub fn outcome(&self) -> Option<&ProbeOutcome> {
        match self {
            Event::StatusChanged(_) => None,
            Event::ResultRecorded(outcome) => Some(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(Event::StatusChanged(RunStatus::Running)).unwrap();
        assert_eq!(json["type"], "status_changed");
        assert_eq!(json["data"], "running");
    }
}
