//! Shared fixtures for poller tests: a temp redb store plus an in-memory
//! cluster, and a few collaborator doubles.

use tempfile::TempDir;

use crate::cluster::{ClusterSnapshot, ClusterState};
use crate::config::ExpiryConfig;
use crate::error::{ExpiryError, Result};
use crate::expiring::{
    ActionKind, ExpiringAction, ExpiringActionDb, ExpiringApiRequest, ExpiringPayload,
};
use crate::ports::{ExpiringActionStore, RequestRegistry};
use crate::request::{Request, RequestCleanup, RequestWithState};
use crate::types::{CreateResult, RequestHistoryType, RequestState};

use super::Poller;

pub(crate) const NOW: i64 = 1_700_000_000_000;

pub(crate) struct Fixture {
    _dir: TempDir,
    pub config: ExpiryConfig,
    pub db: ExpiringActionDb,
    pub cluster: ClusterState,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = ExpiringActionDb::open(&dir.path().join("expiring.db")).unwrap();
        Self {
            _dir: dir,
            config: ExpiryConfig::default(),
            db,
            cluster: ClusterState::new(ClusterSnapshot::default()),
        }
    }

    pub fn poller(&self) -> Poller<'_> {
        Poller::new(
            &self.config,
            &self.db,
            &self.cluster,
            &self.cluster,
            &self.cluster,
            &self.cluster,
        )
    }

    pub fn edit(&self, f: impl FnOnce(&mut ClusterSnapshot)) {
        self.cluster.edit(f);
    }

    pub fn add_request(&self, request: Request, state: RequestState) {
        self.edit(|s| s.insert_request(request, state));
    }

    pub fn snapshot(&self) -> ClusterSnapshot {
        self.cluster.snapshot().unwrap()
    }

    pub fn request(&self, id: &str) -> Request {
        self.snapshot().requests[id].request.clone()
    }

    pub fn request_state(&self, id: &str) -> RequestState {
        self.snapshot().requests[id].state
    }

    pub fn save(&self, action: ExpiringAction) {
        self.db.save_expiring(&action).unwrap();
    }

    pub fn stored(&self, kind: ActionKind) -> Vec<ExpiringAction> {
        self.db.list_expiring(kind).unwrap()
    }

    pub fn pause(&self, request_id: &str, start: i64, duration: u64) -> ExpiringAction {
        ExpiringAction::new(
            request_id,
            "alice",
            start,
            ExpiringApiRequest::new(Some(duration), None),
            ExpiringPayload::Pause,
        )
    }

    pub fn scale(&self, request_id: &str, to: u32, start: i64, duration: u64) -> ExpiringAction {
        ExpiringAction::new(
            request_id,
            "alice",
            start,
            ExpiringApiRequest::new(Some(duration), None),
            ExpiringPayload::Scale {
                revert_to_instances: to,
            },
        )
    }
}

/// Store whose listing fails for one kind.
pub(crate) struct FailingListStore<'a> {
    pub inner: &'a ExpiringActionDb,
    pub failing: ActionKind,
}

impl ExpiringActionStore for FailingListStore<'_> {
    fn list_expiring(&self, kind: ActionKind) -> Result<Vec<ExpiringAction>> {
        if kind == self.failing {
            return Err(ExpiryError::Store("connection refused".into()));
        }
        self.inner.list_expiring(kind)
    }

    fn delete_expiring(&self, kind: ActionKind, request_id: &str) -> Result<()> {
        self.inner.delete_expiring(kind, request_id)
    }

    fn save_expiring(&self, action: &ExpiringAction) -> Result<()> {
        self.inner.save_expiring(action)
    }
}

/// Registry over a `ClusterState` that can pretend a cleanup request already
/// exists or make `bounce` fail, and counts bounce calls.
pub(crate) struct ScriptedRegistry<'a> {
    pub inner: &'a ClusterState,
    pub cleanup_exists: bool,
    pub fail_bounce: bool,
    pub bounces: std::sync::atomic::AtomicU32,
}

impl<'a> ScriptedRegistry<'a> {
    pub fn new(inner: &'a ClusterState) -> Self {
        Self {
            inner,
            cleanup_exists: false,
            fail_bounce: false,
            bounces: std::sync::atomic::AtomicU32::new(0),
        }
    }
}

impl RequestRegistry for ScriptedRegistry<'_> {
    fn request_with_state(&self, request_id: &str) -> Result<Option<RequestWithState>> {
        self.inner.request_with_state(request_id)
    }

    fn update_request(
        &self,
        new: &Request,
        old: Option<&Request>,
        state: RequestState,
        history_type: Option<RequestHistoryType>,
        user: &str,
        skip_healthchecks: Option<bool>,
        message: Option<&str>,
    ) -> Result<()> {
        self.inner
            .update_request(new, old, state, history_type, user, skip_healthchecks, message)
    }

    fn unpause(
        &self,
        request: &Request,
        user: &str,
        message: Option<&str>,
        skip_healthchecks: Option<bool>,
    ) -> Result<()> {
        self.inner.unpause(request, user, message, skip_healthchecks)
    }

    fn in_use_deploy_id(&self, request_id: &str) -> Result<Option<String>> {
        self.inner.in_use_deploy_id(request_id)
    }

    fn create_cleanup_request(&self, cleanup: &RequestCleanup) -> Result<CreateResult> {
        if self.cleanup_exists {
            return Ok(CreateResult::Existed);
        }
        self.inner.create_cleanup_request(cleanup)
    }

    fn bounce(
        &self,
        request: &Request,
        now_millis: i64,
        user: &str,
        message: Option<&str>,
    ) -> Result<()> {
        self.bounces
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_bounce {
            return Err(ExpiryError::Store("bounce rejected".into()));
        }
        self.inner.bounce(request, now_millis, user, message)
    }
}
