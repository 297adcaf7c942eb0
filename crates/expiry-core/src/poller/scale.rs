//! Revert an expired scale.
//!
//! Restores the saved instance count. When the request bounces after
//! scaling, the revert itself starts an incremental bounce and records a new
//! expiring bounce for it; this is the only path that creates expiring
//! actions.

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::Result;
use crate::expiring::{ExpiringAction, ExpiringApiRequest, ExpiringPayload};
use crate::request::{Request, RequestCleanup, RequestWithState};
use crate::types::{CreateResult, RequestCleanupType, RequestHistoryType};

use super::{Poller, Revert};

pub(super) fn revert(
    poller: &Poller<'_>,
    action: &ExpiringAction,
    rws: &RequestWithState,
    revert_to_instances: u32,
    message: &str,
    now_millis: i64,
) -> Result<Revert> {
    let old = &rws.request;
    let new = old.with_instances(revert_to_instances);

    poller.requests.update_request(
        &new,
        Some(old),
        rws.state,
        Some(RequestHistoryType::ScaleReverted),
        &action.user,
        None,
        Some(message),
    )?;

    if new.bounces_after_scale() {
        bounce_after_scale(poller, action, old, &new, now_millis)?;
    }

    poller
        .notifier
        .notify_scaled(&new, old.instances, &action.user)?;
    Ok(Revert::Applied)
}

/// `old` is the request as it was before the revert; the bounce itself is
/// issued against it. The cleanup request and the new expiring bounce are
/// keyed by the reverted request.
fn bounce_after_scale(
    poller: &Poller<'_>,
    action: &ExpiringAction,
    old: &Request,
    request: &Request,
    now_millis: i64,
) -> Result<()> {
    info!(request_id = %request.id, "attempting to bounce request {} after expiring scale", request.id);

    let Some(deploy_id) = poller.requests.in_use_deploy_id(&request.id)? else {
        debug!(
            request_id = %request.id,
            "no active deploy id present for request {}, not bouncing after expiring scale",
            request.id
        );
        return Ok(());
    };

    let bounce_message = format!("Bouncing after expiring scale by {}", action.user);
    let action_id = Uuid::new_v4().to_string();
    let created = poller.requests.create_cleanup_request(&RequestCleanup {
        user: action.user.clone(),
        cleanup_type: RequestCleanupType::IncrementalBounce,
        timestamp: now_millis,
        request_id: request.id.clone(),
        deploy_id: Some(deploy_id.clone()),
        message: Some(bounce_message.clone()),
        action_id: Some(action_id.clone()),
    })?;

    if created == CreateResult::Existed {
        debug!(
            request_id = %request.id,
            "request {} was already bouncing, not bouncing again after expiring scale",
            request.id
        );
        return Ok(());
    }

    let bounce = ExpiringAction::new(
        request.id.clone(),
        action.user.clone(),
        now_millis,
        ExpiringApiRequest::default_bounce(),
        ExpiringPayload::Bounce { deploy_id },
    )
    .with_action_id(action_id.clone());
    let started = poller
        .requests
        .bounce(old, now_millis, &action.user, Some(&bounce_message))
        .and_then(|()| poller.store.save_expiring(&bounce));
    if let Err(e) = started {
        error!(
            request_id = %request.id,
            action_id = %action_id,
            error = %e,
            "cleanup request {action_id} for {} was created but the bounce after expiring scale did not start",
            request.id
        );
        return Err(e);
    }
    Ok(())
}
