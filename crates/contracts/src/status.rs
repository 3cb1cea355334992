//! RunStatus - Dispatcher run state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Running state of the dispatcher.
///
/// Transitions are monotonic: `NotStarted -> Running -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    NotStarted,
    Running,
    Stopped,
}

impl RunStatus {
    /// Whether `self -> next` is an allowed transition
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::NotStarted, RunStatus::Running) | (RunStatus::Running, RunStatus::Stopped)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::NotStarted => "Not Started",
            RunStatus::Running => "Running",
            RunStatus::Stopped => "Stopped",
        };
        f.write_str(label)
    }
}
