use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExpiryError {
    #[error("not initialized: no cluster state at {0}")]
    NotInitialized(String),

    #[error("request not found: {0}")]
    RequestNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{kind} action for request {request_id} has no duration")]
    MissingDuration { kind: String, request_id: String },

    #[error("invalid action kind '{0}'")]
    InvalidKind(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ExpiryError>;
