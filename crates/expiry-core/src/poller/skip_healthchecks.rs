use crate::error::Result;
use crate::expiring::ExpiringAction;
use crate::request::RequestWithState;

use super::{Poller, Revert};

/// Put the request's skip-healthchecks flag back to its saved value.
pub(super) fn revert(
    poller: &Poller<'_>,
    action: &ExpiringAction,
    rws: &RequestWithState,
    revert_to: Option<bool>,
    message: &str,
) -> Result<Revert> {
    let old = &rws.request;
    let new = old.with_skip_healthchecks(revert_to);

    poller.requests.update_request(
        &new,
        Some(old),
        rws.state,
        None,
        &action.user,
        None,
        Some(message),
    )?;
    Ok(Revert::Applied)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{Fixture, NOW};
    use crate::expiring::{ActionKind, ExpiringAction, ExpiringApiRequest, ExpiringPayload};
    use crate::request::Request;
    use crate::types::{RequestHistoryType, RequestState};

    fn skip(request_id: &str, revert_to: Option<bool>) -> ExpiringAction {
        ExpiringAction::new(
            request_id,
            "bob",
            NOW - 10_000,
            ExpiringApiRequest::new(Some(5_000), Some("hotfix".into())),
            ExpiringPayload::SkipHealthchecks {
                revert_to_skip_healthchecks: revert_to,
            },
        )
    }

    #[test]
    fn restores_previous_flag() {
        let fx = Fixture::new();
        fx.add_request(
            Request::new("web", 2).with_skip_healthchecks(Some(true)),
            RequestState::Paused,
        );
        fx.save(skip("web", Some(false)));

        let report = fx.poller().poll_at(NOW);

        assert_eq!(report.kind(ActionKind::SkipHealthchecks).unwrap().applied, 1);
        assert_eq!(fx.request("web").skip_healthchecks, Some(false));
        assert_eq!(fx.request_state("web"), RequestState::Paused);

        let last = fx.snapshot().request_history.last().cloned().unwrap();
        assert_eq!(last.history_type, RequestHistoryType::Updated);
        assert_eq!(
            last.message.as_deref(),
            Some("Skip healthchecks expired after 00:05.0 (hotfix)")
        );
        assert!(fx.stored(ActionKind::SkipHealthchecks).is_empty());
    }

    #[test]
    fn rejected_update_is_contained() {
        let fx = Fixture::new();
        // A zero-instance request fails registry validation on any update.
        fx.edit(|s| {
            s.insert_request(Request::new("web", 0), RequestState::Active);
        });
        fx.save(skip("web", None));

        let report = fx.poller().poll_at(NOW);

        let kind = report.kind(ActionKind::SkipHealthchecks).unwrap();
        assert_eq!(kind.failed, 1);
        assert_eq!(kind.deleted, 1);
        assert!(kind.error.is_none());
    }
}
