//! Expiring user-action poller.
//!
//! One poll pass visits every [`ActionKind`] in a fixed order. For each kind
//! it lists the stored records, skips the ones that are not yet due, reverts
//! the due ones against their owning request, and deletes every due record
//! whether or not the revert succeeded. A failed revert is logged and
//! counted; it never stops the remaining records or kinds.
//!
//! The pass assumes it is the only writer of the expiring-action store in the
//! cluster; see [`crate::leader`] for the leader-only harness that runs it.

mod bounce;
mod pause;
mod scale;
mod skip_healthchecks;

#[cfg(test)]
pub(crate) mod testing;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::ExpiryConfig;
use crate::error::Result;
use crate::expiring::{policy, ActionKind, ExpiringAction, ExpiringPayload};
use crate::ports::{ExpiringActionStore, Notifier, PendingQueue, RequestRegistry, TaskManager};
use crate::request::RequestWithState;

// ---------------------------------------------------------------------------
// Revert
// ---------------------------------------------------------------------------

/// Result of a kind-specific revert step that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revert {
    Applied,
    /// Nothing to undo, e.g. the request was already resumed.
    Skipped { reason: String },
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Tallies for one kind within one poll pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindReport {
    pub kind: ActionKind,
    pub examined: u32,
    pub not_due: u32,
    pub applied: u32,
    pub skipped: u32,
    pub failed: u32,
    pub missing_request: u32,
    /// Records without a usable duration, dropped unprocessed.
    pub malformed: u32,
    pub deleted: u32,
    /// Store failure that cut this kind's pass short.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl KindReport {
    fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            examined: 0,
            not_due: 0,
            applied: 0,
            skipped: 0,
            failed: 0,
            missing_request: 0,
            malformed: 0,
            deleted: 0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub now_millis: i64,
    pub kinds: Vec<KindReport>,
}

impl PollReport {
    pub fn kind(&self, kind: ActionKind) -> Option<&KindReport> {
        self.kinds.iter().find(|r| r.kind == kind)
    }

    pub fn deleted(&self) -> u32 {
        self.kinds.iter().map(|r| r.deleted).sum()
    }

    pub fn has_errors(&self) -> bool {
        self.kinds.iter().any(|r| r.error.is_some())
    }
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

pub struct Poller<'a> {
    config: &'a ExpiryConfig,
    store: &'a dyn ExpiringActionStore,
    requests: &'a dyn RequestRegistry,
    tasks: &'a dyn TaskManager,
    pending: &'a dyn PendingQueue,
    notifier: &'a dyn Notifier,
}

impl<'a> Poller<'a> {
    pub fn new(
        config: &'a ExpiryConfig,
        store: &'a dyn ExpiringActionStore,
        requests: &'a dyn RequestRegistry,
        tasks: &'a dyn TaskManager,
        pending: &'a dyn PendingQueue,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            config,
            store,
            requests,
            tasks,
            pending,
            notifier,
        }
    }

    /// Run one poll pass at the current time. Never fails: store errors end
    /// up in the report and the log.
    pub fn run_once(&self) -> PollReport {
        let report = self.poll_at(Utc::now().timestamp_millis());
        if report.deleted() > 0 || report.has_errors() {
            info!(
                deleted = report.deleted(),
                errors = report.has_errors(),
                "expiring user-action poll finished"
            );
        } else {
            debug!("expiring user-action poll finished with nothing due");
        }
        report
    }

    /// Run one poll pass as of `now_millis`.
    pub fn poll_at(&self, now_millis: i64) -> PollReport {
        let mut kinds = Vec::with_capacity(ActionKind::all().len());
        for &kind in ActionKind::all() {
            let mut report = KindReport::new(kind);
            if let Err(e) = self.check_kind(kind, now_millis, &mut report) {
                error!(%kind, error = %e, "expiring {kind} pass aborted");
                report.error = Some(e.to_string());
            }
            kinds.push(report);
        }
        PollReport { now_millis, kinds }
    }

    fn check_kind(&self, kind: ActionKind, now_millis: i64, report: &mut KindReport) -> Result<()> {
        for action in self.store.list_expiring(kind)? {
            report.examined += 1;

            let duration = match policy::duration_millis(&action, self.config) {
                Ok(d) => d,
                Err(e) => {
                    warn!(request_id = %action.request_id, error = %e, "discarding malformed {action}");
                    self.store.delete_expiring(kind, &action.request_id)?;
                    report.malformed += 1;
                    report.deleted += 1;
                    continue;
                }
            };
            if !policy::is_due(&action, now_millis, self.config)? {
                report.not_due += 1;
                continue;
            }

            match self.requests.request_with_state(&action.request_id)? {
                None => {
                    warn!(
                        request_id = %action.request_id,
                        "request {} not present, discarding {action}",
                        action.request_id
                    );
                    report.missing_request += 1;
                }
                Some(rws) => {
                    let message = policy::expiration_message(&action, duration);
                    match self.revert(&action, &rws, &message, now_millis) {
                        Ok(Revert::Applied) => {
                            info!(request_id = %action.request_id, action_id = %action.action_id, "{message}");
                            report.applied += 1;
                        }
                        Ok(Revert::Skipped { reason }) => {
                            warn!(request_id = %action.request_id, "discarding {action}: {reason}");
                            report.skipped += 1;
                        }
                        Err(e) => {
                            error!(
                                request_id = %action.request_id,
                                action_id = %action.action_id,
                                error = %e,
                                "while trying to apply {action} for {}",
                                action.request_id
                            );
                            report.failed += 1;
                        }
                    }
                }
            }

            self.store.delete_expiring(kind, &action.request_id)?;
            report.deleted += 1;
        }
        Ok(())
    }

    fn revert(
        &self,
        action: &ExpiringAction,
        rws: &RequestWithState,
        message: &str,
        now_millis: i64,
    ) -> Result<Revert> {
        match &action.payload {
            ExpiringPayload::Bounce { deploy_id } => {
                bounce::revert(self, action, deploy_id, message, now_millis)
            }
            ExpiringPayload::Pause => pause::revert(self, action, rws, message),
            ExpiringPayload::Scale {
                revert_to_instances,
            } => scale::revert(self, action, rws, *revert_to_instances, message, now_millis),
            ExpiringPayload::SkipHealthchecks {
                revert_to_skip_healthchecks,
            } => skip_healthchecks::revert(self, action, rws, *revert_to_skip_healthchecks, message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{Fixture, NOW};
    use super::*;
    use crate::error::ExpiryError;
    use crate::expiring::{ExpiringAction, ExpiringApiRequest};
    use crate::request::Request;
    use crate::types::RequestState;

    #[test]
    fn empty_store_reports_every_kind_in_order() {
        let fx = Fixture::new();
        let report = fx.poller().poll_at(NOW);
        let kinds: Vec<_> = report.kinds.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, ActionKind::all());
        assert_eq!(report.deleted(), 0);
        assert!(!report.has_errors());
    }

    #[test]
    fn not_yet_due_is_left_in_store() {
        let fx = Fixture::new();
        fx.add_request(Request::new("web", 2), RequestState::Paused);
        fx.save(fx.pause("web", NOW - 5_000, 5_000));

        let report = fx.poller().poll_at(NOW);

        let pause = report.kind(ActionKind::Pause).unwrap();
        assert_eq!(pause.examined, 1);
        assert_eq!(pause.not_due, 1);
        assert_eq!(pause.deleted, 0);
        assert_eq!(fx.stored(ActionKind::Pause).len(), 1);
        assert_eq!(fx.request_state("web"), RequestState::Paused);
    }

    #[test]
    fn missing_request_still_deletes_record() {
        let fx = Fixture::new();
        fx.save(fx.pause("gone", NOW - 10_000, 5_000));

        let report = fx.poller().poll_at(NOW);

        let pause = report.kind(ActionKind::Pause).unwrap();
        assert_eq!(pause.missing_request, 1);
        assert_eq!(pause.deleted, 1);
        assert!(fx.stored(ActionKind::Pause).is_empty());
    }

    #[test]
    fn failed_revert_still_deletes_and_continues() {
        let fx = Fixture::new();
        fx.add_request(Request::new("web", 5), RequestState::Active);
        fx.add_request(Request::new("api", 5), RequestState::Active);
        // Zero instances is rejected by the registry.
        fx.save(fx.scale("web", 0, NOW - 10_000, 5_000));
        fx.save(fx.scale("api", 2, NOW - 10_000, 5_000));

        let report = fx.poller().poll_at(NOW);

        let scale = report.kind(ActionKind::Scale).unwrap();
        assert_eq!(scale.failed, 1);
        assert_eq!(scale.applied, 1);
        assert_eq!(scale.deleted, 2);
        assert!(fx.stored(ActionKind::Scale).is_empty());
        assert_eq!(fx.request("web").instances, 5);
        assert_eq!(fx.request("api").instances, 2);
    }

    #[test]
    fn malformed_record_is_discarded() {
        let fx = Fixture::new();
        fx.add_request(Request::new("web", 2), RequestState::Paused);
        fx.save(ExpiringAction::new(
            "web",
            "alice",
            NOW - 10_000,
            ExpiringApiRequest::new(None, None),
            crate::expiring::ExpiringPayload::Pause,
        ));

        let report = fx.poller().poll_at(NOW);

        let pause = report.kind(ActionKind::Pause).unwrap();
        assert_eq!(pause.malformed, 1);
        assert_eq!(pause.deleted, 1);
        assert_eq!(fx.request_state("web"), RequestState::Paused);
    }

    #[test]
    fn store_failure_in_one_kind_does_not_stop_the_others() {
        let fx = Fixture::new();
        fx.add_request(Request::new("web", 2), RequestState::Paused);
        fx.save(fx.pause("web", NOW - 10_000, 5_000));

        let store = testing::FailingListStore {
            inner: &fx.db,
            failing: ActionKind::Bounce,
        };
        let poller = Poller::new(
            &fx.config,
            &store,
            &fx.cluster,
            &fx.cluster,
            &fx.cluster,
            &fx.cluster,
        );
        let report = poller.poll_at(NOW);

        assert!(report.kind(ActionKind::Bounce).unwrap().error.is_some());
        assert_eq!(report.kind(ActionKind::Pause).unwrap().applied, 1);
        assert_eq!(fx.request_state("web"), RequestState::Active);
    }

    #[test]
    fn kinds_for_the_same_request_are_independent() {
        let fx = Fixture::new();
        fx.add_request(Request::new("web", 5), RequestState::Paused);
        fx.save(fx.pause("web", NOW - 10_000, 5_000));
        fx.save(fx.scale("web", 3, NOW - 1_000, 5_000));

        let report = fx.poller().poll_at(NOW);

        assert_eq!(report.kind(ActionKind::Pause).unwrap().deleted, 1);
        assert_eq!(report.kind(ActionKind::Scale).unwrap().not_due, 1);
        assert_eq!(fx.stored(ActionKind::Scale).len(), 1);
    }

    #[test]
    fn run_once_uses_wall_clock() {
        let fx = Fixture::new();
        fx.add_request(Request::new("web", 2), RequestState::Paused);
        let started = Utc::now().timestamp_millis() - 60_000;
        fx.save(fx.pause("web", started, 1_000));

        let report = fx.poller().run_once();

        assert!(report.now_millis > started);
        assert_eq!(report.kind(ActionKind::Pause).unwrap().applied, 1);
    }

    #[test]
    fn missing_duration_error_names_kind() {
        let err = ExpiryError::MissingDuration {
            kind: "scale".into(),
            request_id: "web".into(),
        };
        assert_eq!(err.to_string(), "scale action for request web has no duration");
    }
}
