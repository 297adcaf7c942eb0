use crate::types::ExtendedTaskState;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// TaskId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId {
    pub request_id: String,
    pub deploy_id: String,
    pub started_at: i64,
    pub instance_no: u32,
    pub host: String,
}

impl TaskId {
    pub fn new(
        request_id: impl Into<String>,
        deploy_id: impl Into<String>,
        started_at: i64,
        instance_no: u32,
        host: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            deploy_id: deploy_id.into(),
            started_at,
            instance_no,
            host: host.into(),
        }
    }

    /// Flat string form for logs: `request-deploy-started-instance-host`. Not
    /// unique when ids contain `-`; compare `TaskId`s instead.
    pub fn id(&self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.request_id, self.deploy_id, self.started_at, self.instance_no, self.host
        )
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

// ---------------------------------------------------------------------------
// TaskCleanup
// ---------------------------------------------------------------------------

/// Queued directive to tear down one running task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCleanup {
    pub task_id: TaskId,
    pub user: String,
    pub timestamp: i64,
    pub message: Option<String>,
    /// Correlates the cleanup with the expiring action that queued it.
    pub action_id: Option<String>,
}

// ---------------------------------------------------------------------------
// TaskHistoryUpdate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHistoryUpdate {
    pub task_id: TaskId,
    pub state: ExtendedTaskState,
    pub timestamp: i64,
    pub status_message: Option<String>,
}

impl Ord for TaskHistoryUpdate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then(self.state.cmp(&other.state))
    }
}

impl PartialOrd for TaskHistoryUpdate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
