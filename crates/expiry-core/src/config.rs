use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ExpiryConfig
// ---------------------------------------------------------------------------

/// Poller settings, read from `.expiry/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryConfig {
    /// Period of the leader-only poll loop.
    #[serde(default = "default_check_every_millis")]
    pub check_expiring_user_action_every_millis: u64,
    /// Lifetime of a bounce whose request did not carry an explicit duration.
    #[serde(default = "default_bounce_expiration_minutes")]
    pub default_bounce_expiration_minutes: u64,
}

fn default_check_every_millis() -> u64 {
    45_000
}

fn default_bounce_expiration_minutes() -> u64 {
    60
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            check_expiring_user_action_every_millis: default_check_every_millis(),
            default_bounce_expiration_minutes: default_bounce_expiration_minutes(),
        }
    }
}

impl ExpiryConfig {
    /// Load the config, falling back to defaults when the file is absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: ExpiryConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn default_bounce_expiration_millis(&self) -> u64 {
        self.default_bounce_expiration_minutes.saturating_mul(60_000)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.check_expiring_user_action_every_millis == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "check_expiring_user_action_every_millis must be greater than zero"
                    .to_string(),
            });
        }

        if self.default_bounce_expiration_minutes == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "default_bounce_expiration_minutes is 0: bounces without a duration \
                          are cancelled on the next poll"
                    .to_string(),
            });
        }

        warnings
    }
}
