use crate::types::{PendingType, RequestCleanupType, RequestHistoryType, RequestState};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A persistent service/job definition. Values are treated as immutable:
/// reverts derive a new `Request` and hand both old and new to the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    #[serde(default = "default_instances")]
    pub instances: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_healthchecks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounce_after_scale: Option<bool>,
}

fn default_instances() -> u32 {
    1
}

impl Request {
    pub fn new(id: impl Into<String>, instances: u32) -> Self {
        Self {
            id: id.into(),
            instances,
            skip_healthchecks: None,
            bounce_after_scale: None,
        }
    }

    pub fn with_instances(&self, instances: u32) -> Self {
        Self {
            instances,
            ..self.clone()
        }
    }

    pub fn with_skip_healthchecks(&self, skip_healthchecks: Option<bool>) -> Self {
        Self {
            skip_healthchecks,
            ..self.clone()
        }
    }

    pub fn with_bounce_after_scale(&self, bounce_after_scale: bool) -> Self {
        Self {
            bounce_after_scale: Some(bounce_after_scale),
            ..self.clone()
        }
    }

    pub fn bounces_after_scale(&self) -> bool {
        self.bounce_after_scale.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestWithState {
    pub request: Request,
    pub state: RequestState,
}

// ---------------------------------------------------------------------------
// RequestCleanup
// ---------------------------------------------------------------------------

/// A request-level cleanup directive (e.g. an incremental bounce).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestCleanup {
    pub user: String,
    pub cleanup_type: RequestCleanupType,
    pub timestamp: i64,
    pub request_id: String,
    pub deploy_id: Option<String>,
    pub message: Option<String>,
    pub action_id: Option<String>,
}

// ---------------------------------------------------------------------------
// RequestHistory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestHistory {
    pub request_id: String,
    pub history_type: RequestHistoryType,
    pub user: String,
    pub timestamp: i64,
    pub instances: u32,
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// PendingRequest
// ---------------------------------------------------------------------------

/// Queued directive to (re)schedule tasks for a request/deploy pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: String,
    pub deploy_id: String,
    pub timestamp: i64,
    pub user: String,
    pub pending_type: PendingType,
    pub message: Option<String>,
    pub action_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_healthchecks: Option<bool>,
}
