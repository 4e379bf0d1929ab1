use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by executions and their steps.
///
/// ```text
/// UNKNOWN ──► RUNNING ──► COMPLETED
///    │           ├──────► FAILED
///    └───────────┴──────► STOPPED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    #[default]
    Unknown,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Stopped
        )
    }

    /// Whether `self -> next` is a legal transition. Staying in the same
    /// status is not a transition and is never reported as legal here.
    pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
        use ExecutionStatus::*;
        matches!(
            (self, next),
            (Unknown, Running)
                | (Unknown, Stopped)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Stopped)
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStatus::Unknown => "UNKNOWN",
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Failed => "FAILED",
            ExecutionStatus::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}
