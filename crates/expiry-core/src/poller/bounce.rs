//! Cancel an expired bounce.
//!
//! Every task cleanup and pending request tagged with the bounce's action id
//! is withdrawn, then a `CANCEL_BOUNCE` pending request is queued so a bounce
//! still in flight observes the cancellation. Entries carrying another action
//! id belong to a newer action and are left alone.

use tracing::info;

use crate::error::Result;
use crate::expiring::ExpiringAction;
use crate::request::PendingRequest;
use crate::types::{ExtendedTaskState, PendingType};

use super::{Poller, Revert};

pub(super) fn revert(
    poller: &Poller<'_>,
    action: &ExpiringAction,
    deploy_id: &str,
    message: &str,
    now_millis: i64,
) -> Result<Revert> {
    let tasks = poller.tasks;

    for cleanup in tasks.cleanup_tasks()? {
        if cleanup.task_id.request_id != action.request_id
            || cleanup.action_id.as_deref() != Some(action.action_id.as_str())
        {
            continue;
        }

        let task_id = &cleanup.task_id;
        info!(task_id = %task_id, "discarding cleanup for {task_id} because of {action}");
        tasks.delete_cleanup_task(&cleanup)?;

        if tasks.cleanup_task(task_id)?.is_some() {
            continue;
        }

        info!(task_id = %task_id, "no other task cleanups found, removing cleaning update");
        let mut updates = tasks.task_history_updates(task_id)?;
        updates.sort();
        if updates.last().map(|u| u.state) == Some(ExtendedTaskState::TaskCleaning) {
            let previous = updates.len().checked_sub(2).and_then(|i| updates.get(i));
            tasks.delete_task_history_update(
                task_id,
                ExtendedTaskState::TaskCleaning,
                previous,
            )?;
        }
    }

    if let Some(pending) = poller.pending.pending_request(&action.request_id, deploy_id)? {
        if pending.action_id.as_deref() == Some(action.action_id.as_str()) {
            info!(
                request_id = %action.request_id,
                "discarding pending request for {} because of {action}",
                action.request_id
            );
            poller.pending.delete_pending_request(&pending)?;
        }
    }

    poller.pending.enqueue(PendingRequest {
        request_id: action.request_id.clone(),
        deploy_id: deploy_id.to_string(),
        timestamp: now_millis,
        user: action.user.clone(),
        pending_type: PendingType::CancelBounce,
        message: Some(message.to_string()),
        action_id: Some(action.action_id.clone()),
        skip_healthchecks: None,
    })?;

    Ok(Revert::Applied)
}
