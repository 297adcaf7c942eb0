//! Collaborator contracts consumed by the poller.
//!
//! Each trait covers one external store or service. Implementations must be
//! safe to call from the single poll thread; every method is a synchronous,
//! blocking call and any timeout/retry policy belongs to the implementation.

use crate::error::Result;
use crate::expiring::{ActionKind, ExpiringAction};
use crate::request::{PendingRequest, Request, RequestCleanup, RequestWithState};
use crate::task::{TaskCleanup, TaskHistoryUpdate, TaskId};
use crate::types::{CreateResult, ExtendedTaskState, RequestHistoryType, RequestState};

/// Persisted expiring-action records, at most one per `(request_id, kind)`.
pub trait ExpiringActionStore: Send + Sync {
    /// Every stored record of `kind`, due or not.
    fn list_expiring(&self, kind: ActionKind) -> Result<Vec<ExpiringAction>>;

    fn delete_expiring(&self, kind: ActionKind, request_id: &str) -> Result<()>;

    /// Insert or overwrite the record for `(action.request_id, action.kind())`.
    fn save_expiring(&self, action: &ExpiringAction) -> Result<()>;
}

/// The owning requests, their deploy pointers and request-level cleanups.
pub trait RequestRegistry: Send + Sync {
    fn request_with_state(&self, request_id: &str) -> Result<Option<RequestWithState>>;

    /// Replace `old` with `new`, keeping `state`, and append a history entry.
    /// Rejected updates come back as `Err`.
    #[allow(clippy::too_many_arguments)]
    fn update_request(
        &self,
        new: &Request,
        old: Option<&Request>,
        state: RequestState,
        history_type: Option<RequestHistoryType>,
        user: &str,
        skip_healthchecks: Option<bool>,
        message: Option<&str>,
    ) -> Result<()>;

    fn unpause(
        &self,
        request: &Request,
        user: &str,
        message: Option<&str>,
        skip_healthchecks: Option<bool>,
    ) -> Result<()>;

    fn in_use_deploy_id(&self, request_id: &str) -> Result<Option<String>>;

    /// Create-if-absent, keyed by `(request_id, action_id)`.
    fn create_cleanup_request(&self, cleanup: &RequestCleanup) -> Result<CreateResult>;

    fn bounce(&self, request: &Request, now_millis: i64, user: &str, message: Option<&str>)
        -> Result<()>;
}

/// Task cleanup queue and task-history log.
pub trait TaskManager: Send + Sync {
    fn cleanup_tasks(&self) -> Result<Vec<TaskCleanup>>;

    /// Remove exactly this cleanup; others queued for the same task stay.
    fn delete_cleanup_task(&self, cleanup: &TaskCleanup) -> Result<()>;

    /// Any cleanup still queued for the task.
    fn cleanup_task(&self, task_id: &TaskId) -> Result<Option<TaskCleanup>>;

    /// History updates for one task, in storage order.
    fn task_history_updates(&self, task_id: &TaskId) -> Result<Vec<TaskHistoryUpdate>>;

    /// Remove the update recorded for `state`, making `previous` (if any)
    /// the task's latest update.
    fn delete_task_history_update(
        &self,
        task_id: &TaskId,
        state: ExtendedTaskState,
        previous: Option<&TaskHistoryUpdate>,
    ) -> Result<()>;
}

/// Pending-request queue.
pub trait PendingQueue: Send + Sync {
    fn pending_request(&self, request_id: &str, deploy_id: &str)
        -> Result<Option<PendingRequest>>;

    fn delete_pending_request(&self, pending: &PendingRequest) -> Result<()>;

    fn enqueue(&self, pending: PendingRequest) -> Result<()>;
}

/// Outbound notifications (mail, chat, ...).
pub trait Notifier: Send + Sync {
    fn notify_scaled(&self, request: &Request, old_instances: u32, user: &str) -> Result<()>;
}
