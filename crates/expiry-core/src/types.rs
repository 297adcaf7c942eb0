use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// RequestState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Active,
    Paused,
    Deleted,
    SystemCooldown,
    Finished,
    DeployingToUnpause,
}

impl RequestState {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Active => "active",
            RequestState::Paused => "paused",
            RequestState::Deleted => "deleted",
            RequestState::SystemCooldown => "system_cooldown",
            RequestState::Finished => "finished",
            RequestState::DeployingToUnpause => "deploying_to_unpause",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestState {
    type Err = crate::error::ExpiryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(RequestState::Active),
            "paused" => Ok(RequestState::Paused),
            "deleted" => Ok(RequestState::Deleted),
            "system_cooldown" => Ok(RequestState::SystemCooldown),
            "finished" => Ok(RequestState::Finished),
            "deploying_to_unpause" => Ok(RequestState::DeployingToUnpause),
            _ => Err(crate::error::ExpiryError::InvalidState(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// RequestHistoryType
// ---------------------------------------------------------------------------

/// Tag recorded alongside every request mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestHistoryType {
    Created,
    Updated,
    Deleted,
    Paused,
    Unpaused,
    Bounced,
    Scaled,
    ScaleReverted,
}

// ---------------------------------------------------------------------------
// RequestCleanupType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestCleanupType {
    Deleting,
    Pausing,
    Bounce,
    IncrementalBounce,
}

// ---------------------------------------------------------------------------
// PendingType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingType {
    Immediate,
    Onetime,
    NewDeploy,
    Bounce,
    CancelBounce,
    Unpaused,
    Updated,
}

// ---------------------------------------------------------------------------
// ExtendedTaskState
// ---------------------------------------------------------------------------

/// Task states as recorded in the task-history log.
///
/// Declaration order is the lifecycle order and breaks timestamp ties when
/// history updates are sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtendedTaskState {
    TaskLaunched,
    TaskStaging,
    TaskStarting,
    TaskRunning,
    TaskCleaning,
    TaskKilling,
    TaskFinished,
    TaskFailed,
    TaskKilled,
    TaskLost,
}

impl ExtendedTaskState {
    pub fn is_done(self) -> bool {
        matches!(
            self,
            ExtendedTaskState::TaskFinished
                | ExtendedTaskState::TaskFailed
                | ExtendedTaskState::TaskKilled
                | ExtendedTaskState::TaskLost
        )
    }
}

// ---------------------------------------------------------------------------
// CreateResult
// ---------------------------------------------------------------------------

/// Outcome of a create-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateResult {
    Created,
    Existed,
}
