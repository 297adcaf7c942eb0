//! Data model for expiring user actions.
//!
//! An `ExpiringAction` records a time-bounded user action (bounce, pause,
//! scale, skip healthchecks) that must be reverted or finalized once its
//! deadline passes. The store keeps at most one record per
//! `(request_id, kind)`; the poller reads, reverts and deletes them.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Bounce,
    Pause,
    Scale,
    SkipHealthchecks,
}

impl ActionKind {
    /// Every kind, in the order the poller visits them.
    pub fn all() -> &'static [ActionKind] {
        &[
            ActionKind::Bounce,
            ActionKind::Pause,
            ActionKind::Scale,
            ActionKind::SkipHealthchecks,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Bounce => "bounce",
            ActionKind::Pause => "pause",
            ActionKind::Scale => "scale",
            ActionKind::SkipHealthchecks => "skip_healthchecks",
        }
    }

    /// Human name used in expiration messages.
    pub fn action_name(self) -> &'static str {
        match self {
            ActionKind::Bounce => "Bounce",
            ActionKind::Pause => "Pause",
            ActionKind::Scale => "Scale",
            ActionKind::SkipHealthchecks => "Skip healthchecks",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActionKind {
    type Err = crate::error::ExpiryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bounce" => Ok(ActionKind::Bounce),
            "pause" => Ok(ActionKind::Pause),
            "scale" => Ok(ActionKind::Scale),
            "skip_healthchecks" | "skip-healthchecks" => Ok(ActionKind::SkipHealthchecks),
            _ => Err(crate::error::ExpiryError::InvalidKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ExpiringApiRequest
// ---------------------------------------------------------------------------

/// The user-supplied part of the original API call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpiringApiRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExpiringApiRequest {
    pub fn new(duration_millis: Option<u64>, message: Option<String>) -> Self {
        Self {
            duration_millis,
            message,
        }
    }

    /// Parameters of a bounce started by the system rather than a user:
    /// no duration (configured default applies) and no message.
    pub fn default_bounce() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// ExpiringPayload
// ---------------------------------------------------------------------------

/// Kind-specific data needed to revert the action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpiringPayload {
    /// The deploy the bounce was started against.
    Bounce { deploy_id: String },
    Pause,
    Scale { revert_to_instances: u32 },
    SkipHealthchecks {
        #[serde(default)]
        revert_to_skip_healthchecks: Option<bool>,
    },
}

impl ExpiringPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Bounce { .. } => ActionKind::Bounce,
            Self::Pause => ActionKind::Pause,
            Self::Scale { .. } => ActionKind::Scale,
            Self::SkipHealthchecks { .. } => ActionKind::SkipHealthchecks,
        }
    }
}

// ---------------------------------------------------------------------------
// ExpiringAction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiringAction {
    pub request_id: String,
    /// Token linking this action to the cleanups and pending requests it spawned.
    pub action_id: String,
    pub user: String,
    /// Creation time, epoch millis.
    pub start_millis: i64,
    pub api_request: ExpiringApiRequest,
    pub payload: ExpiringPayload,
}

impl ExpiringAction {
    /// Create an action with a fresh action id.
    pub fn new(
        request_id: impl Into<String>,
        user: impl Into<String>,
        start_millis: i64,
        api_request: ExpiringApiRequest,
        payload: ExpiringPayload,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            action_id: Uuid::new_v4().to_string(),
            user: user.into(),
            start_millis,
            api_request,
            payload,
        }
    }

    pub fn with_action_id(mut self, action_id: impl Into<String>) -> Self {
        self.action_id = action_id.into();
        self
    }

    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }
}

impl fmt::Display for ExpiringAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expiring {} of {} by {} (action {})",
            self.kind(),
            self.request_id,
            self.user,
            self.action_id
        )
    }
}
