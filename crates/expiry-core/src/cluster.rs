//! File-backed cluster state.
//!
//! `ClusterState` holds requests, deploy pointers, the task-cleanup queue,
//! task history, the pending queue, request cleanups and notifications in a
//! single YAML document (`.expiry/cluster.yaml`). It implements every
//! collaborator trait the poller needs besides the expiring-action store.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{ExpiryError, Result};
use crate::paths;
use crate::ports::{Notifier, PendingQueue, RequestRegistry, TaskManager};
use crate::request::{PendingRequest, Request, RequestCleanup, RequestHistory, RequestWithState};
use crate::task::{TaskCleanup, TaskHistoryUpdate, TaskId};
use crate::types::{
    CreateResult, ExtendedTaskState, PendingType, RequestHistoryType, RequestState,
};

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub request_id: String,
    pub old_instances: u32,
    pub new_instances: u32,
    pub user: String,
    pub timestamp: i64,
}

// ---------------------------------------------------------------------------
// TaskHistory
// ---------------------------------------------------------------------------

/// History log of one task plus its latest-update pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHistory {
    pub task_id: TaskId,
    /// In the order they were recorded.
    #[serde(default)]
    pub updates: Vec<TaskHistoryUpdate>,
    #[serde(default)]
    pub latest: Option<TaskHistoryUpdate>,
}

// ---------------------------------------------------------------------------
// ClusterSnapshot
// ---------------------------------------------------------------------------

/// Serializable contents of the cluster state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub requests: BTreeMap<String, RequestWithState>,
    /// Request id -> in-use deploy id.
    #[serde(default)]
    pub in_use_deploys: BTreeMap<String, String>,
    #[serde(default)]
    pub task_cleanups: Vec<TaskCleanup>,
    #[serde(default)]
    pub task_history: Vec<TaskHistory>,
    #[serde(default)]
    pub pending_requests: Vec<PendingRequest>,
    #[serde(default)]
    pub request_cleanups: Vec<RequestCleanup>,
    #[serde(default)]
    pub request_history: Vec<RequestHistory>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

impl ClusterSnapshot {
    pub fn insert_request(&mut self, request: Request, state: RequestState) {
        self.requests
            .insert(request.id.clone(), RequestWithState { request, state });
    }

    pub fn set_in_use_deploy(&mut self, request_id: impl Into<String>, deploy_id: impl Into<String>) {
        self.in_use_deploys.insert(request_id.into(), deploy_id.into());
    }

    /// Append a task history update and make it the task's latest.
    pub fn record_task_update(&mut self, update: TaskHistoryUpdate) {
        let history = self.history_mut(&update.task_id);
        history.latest = Some(update.clone());
        history.updates.push(update);
    }

    pub fn task_updates(&self, task_id: &TaskId) -> &[TaskHistoryUpdate] {
        self.task_history
            .iter()
            .find(|h| h.task_id == *task_id)
            .map(|h| h.updates.as_slice())
            .unwrap_or_default()
    }

    pub fn latest_task_update(&self, task_id: &TaskId) -> Option<&TaskHistoryUpdate> {
        self.task_history
            .iter()
            .find(|h| h.task_id == *task_id)
            .and_then(|h| h.latest.as_ref())
    }

    fn history_mut(&mut self, task_id: &TaskId) -> &mut TaskHistory {
        let pos = match self.task_history.iter().position(|h| h.task_id == *task_id) {
            Some(pos) => pos,
            None => {
                self.task_history.push(TaskHistory {
                    task_id: task_id.clone(),
                    updates: Vec::new(),
                    latest: None,
                });
                self.task_history.len() - 1
            }
        };
        &mut self.task_history[pos]
    }

    fn push_history(
        &mut self,
        request: &Request,
        history_type: RequestHistoryType,
        user: &str,
        message: Option<&str>,
    ) {
        self.request_history.push(RequestHistory {
            request_id: request.id.clone(),
            history_type,
            user: user.to_string(),
            timestamp: Utc::now().timestamp_millis(),
            instances: request.instances,
            message: message.map(str::to_string),
        });
    }

    fn enqueue_for_in_use_deploy(
        &mut self,
        request_id: &str,
        pending_type: PendingType,
        user: &str,
        message: Option<&str>,
        skip_healthchecks: Option<bool>,
    ) {
        if let Some(deploy_id) = self.in_use_deploys.get(request_id).cloned() {
            self.pending_requests.push(PendingRequest {
                request_id: request_id.to_string(),
                deploy_id,
                timestamp: Utc::now().timestamp_millis(),
                user: user.to_string(),
                pending_type,
                message: message.map(str::to_string),
                action_id: None,
                skip_healthchecks,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// ClusterState
// ---------------------------------------------------------------------------

pub struct ClusterState {
    inner: Mutex<ClusterSnapshot>,
}

impl ClusterState {
    pub fn new(snapshot: ClusterSnapshot) -> Self {
        Self {
            inner: Mutex::new(snapshot),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::cluster_path(root);
        if !path.exists() {
            return Err(ExpiryError::NotInitialized(path.display().to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let snapshot: ClusterSnapshot = serde_yaml::from_str(&data)?;
        Ok(Self::new(snapshot))
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::cluster_path(root);
        let data = serde_yaml::to_string(&*self.lock()?)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// A copy of the current contents.
    pub fn snapshot(&self) -> Result<ClusterSnapshot> {
        Ok(self.lock()?.clone())
    }

    #[cfg(test)]
    pub(crate) fn edit(&self, f: impl FnOnce(&mut ClusterSnapshot)) {
        f(&mut self.inner.lock().unwrap());
    }

    fn lock(&self) -> Result<MutexGuard<'_, ClusterSnapshot>> {
        self.inner
            .lock()
            .map_err(|_| ExpiryError::Store("cluster state lock poisoned".to_string()))
    }
}

impl RequestRegistry for ClusterState {
    fn request_with_state(&self, request_id: &str) -> Result<Option<RequestWithState>> {
        Ok(self.lock()?.requests.get(request_id).cloned())
    }

    fn update_request(
        &self,
        new: &Request,
        _old: Option<&Request>,
        state: RequestState,
        history_type: Option<RequestHistoryType>,
        user: &str,
        skip_healthchecks: Option<bool>,
        message: Option<&str>,
    ) -> Result<()> {
        if new.instances == 0 {
            return Err(ExpiryError::InvalidRequest(format!(
                "request {} must have at least one instance",
                new.id
            )));
        }

        let mut snap = self.lock()?;
        let entry = snap
            .requests
            .get_mut(&new.id)
            .ok_or_else(|| ExpiryError::RequestNotFound(new.id.clone()))?;
        entry.request = new.clone();
        entry.state = state;

        snap.push_history(
            new,
            history_type.unwrap_or(RequestHistoryType::Updated),
            user,
            message,
        );
        if state == RequestState::Active {
            snap.enqueue_for_in_use_deploy(
                &new.id,
                PendingType::Updated,
                user,
                message,
                skip_healthchecks,
            );
        }
        Ok(())
    }

    fn unpause(
        &self,
        request: &Request,
        user: &str,
        message: Option<&str>,
        skip_healthchecks: Option<bool>,
    ) -> Result<()> {
        let mut snap = self.lock()?;
        let entry = snap
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| ExpiryError::RequestNotFound(request.id.clone()))?;
        entry.state = RequestState::Active;

        snap.push_history(request, RequestHistoryType::Unpaused, user, message);
        snap.enqueue_for_in_use_deploy(
            &request.id,
            PendingType::Unpaused,
            user,
            message,
            skip_healthchecks,
        );
        Ok(())
    }

    fn in_use_deploy_id(&self, request_id: &str) -> Result<Option<String>> {
        Ok(self.lock()?.in_use_deploys.get(request_id).cloned())
    }

    fn create_cleanup_request(&self, cleanup: &RequestCleanup) -> Result<CreateResult> {
        let mut snap = self.lock()?;
        let exists = snap
            .request_cleanups
            .iter()
            .any(|c| c.request_id == cleanup.request_id && c.action_id == cleanup.action_id);
        if exists {
            return Ok(CreateResult::Existed);
        }
        snap.request_cleanups.push(cleanup.clone());
        Ok(CreateResult::Created)
    }

    fn bounce(
        &self,
        request: &Request,
        _now_millis: i64,
        user: &str,
        message: Option<&str>,
    ) -> Result<()> {
        self.lock()?
            .push_history(request, RequestHistoryType::Bounced, user, message);
        Ok(())
    }
}

impl TaskManager for ClusterState {
    fn cleanup_tasks(&self) -> Result<Vec<TaskCleanup>> {
        Ok(self.lock()?.task_cleanups.clone())
    }

    fn delete_cleanup_task(&self, cleanup: &TaskCleanup) -> Result<()> {
        let mut snap = self.lock()?;
        if let Some(pos) = snap.task_cleanups.iter().position(|c| c == cleanup) {
            snap.task_cleanups.remove(pos);
        }
        Ok(())
    }

    fn cleanup_task(&self, task_id: &TaskId) -> Result<Option<TaskCleanup>> {
        Ok(self
            .lock()?
            .task_cleanups
            .iter()
            .find(|c| c.task_id == *task_id)
            .cloned())
    }

    fn task_history_updates(&self, task_id: &TaskId) -> Result<Vec<TaskHistoryUpdate>> {
        Ok(self.lock()?.task_updates(task_id).to_vec())
    }

    fn delete_task_history_update(
        &self,
        task_id: &TaskId,
        state: ExtendedTaskState,
        previous: Option<&TaskHistoryUpdate>,
    ) -> Result<()> {
        let mut snap = self.lock()?;
        let history = snap.history_mut(task_id);
        history.updates.retain(|u| u.state != state);
        history.latest = previous.cloned();
        Ok(())
    }
}

impl PendingQueue for ClusterState {
    fn pending_request(&self, request_id: &str, deploy_id: &str) -> Result<Option<PendingRequest>> {
        Ok(self
            .lock()?
            .pending_requests
            .iter()
            .find(|p| p.request_id == request_id && p.deploy_id == deploy_id)
            .cloned())
    }

    fn delete_pending_request(&self, pending: &PendingRequest) -> Result<()> {
        self.lock()?.pending_requests.retain(|p| p != pending);
        Ok(())
    }

    fn enqueue(&self, pending: PendingRequest) -> Result<()> {
        self.lock()?.pending_requests.push(pending);
        Ok(())
    }
}

impl Notifier for ClusterState {
    fn notify_scaled(&self, request: &Request, old_instances: u32, user: &str) -> Result<()> {
        tracing::info!(
            request_id = %request.id,
            old_instances,
            new_instances = request.instances,
            user,
            "request scaled"
        );
        self.lock()?.notifications.push(Notification {
            request_id: request.id.clone(),
            old_instances,
            new_instances: request.instances,
            user: user.to_string(),
            timestamp: Utc::now().timestamp_millis(),
        });
        Ok(())
    }
}
