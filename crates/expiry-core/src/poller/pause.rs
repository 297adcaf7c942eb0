//! End an expired pause.

use tracing::info;

use crate::error::Result;
use crate::expiring::ExpiringAction;
use crate::request::RequestWithState;
use crate::types::RequestState;

use super::{Poller, Revert};

/// Unpause the request, unless something else already moved it out of
/// `Paused`, in which case the action is dropped without touching it.
pub(super) fn revert(
    poller: &Poller<'_>,
    action: &ExpiringAction,
    rws: &RequestWithState,
    message: &str,
) -> Result<Revert> {
    if rws.state != RequestState::Paused {
        return Ok(Revert::Skipped {
            reason: format!("request {} is in state {}", rws.request.id, rws.state),
        });
    }

    info!(request_id = %rws.request.id, "unpausing request {} because of {action}", rws.request.id);
    poller
        .requests
        .unpause(&rws.request, &action.user, Some(message), None)?;
    Ok(Revert::Applied)
}
