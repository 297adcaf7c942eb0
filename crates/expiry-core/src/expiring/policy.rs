//! Deadline policy: how long an expiring action lives and whether it is due.

use crate::config::ExpiryConfig;
use crate::error::{ExpiryError, Result};

use super::action::{ActionKind, ExpiringAction};

/// Lifetime of `action` in milliseconds.
///
/// Bounces fall back to the configured default bounce expiration; every other
/// kind must carry an explicit duration.
pub fn duration_millis(action: &ExpiringAction, config: &ExpiryConfig) -> Result<u64> {
    match (action.api_request.duration_millis, action.kind()) {
        (Some(d), _) => Ok(d),
        (None, ActionKind::Bounce) => Ok(config.default_bounce_expiration_millis()),
        (None, kind) => Err(ExpiryError::MissingDuration {
            kind: kind.to_string(),
            request_id: action.request_id.clone(),
        }),
    }
}

/// True iff strictly more than the action's lifetime has elapsed at `now_millis`.
pub fn is_due(action: &ExpiringAction, now_millis: i64, config: &ExpiryConfig) -> Result<bool> {
    let duration = duration_millis(action, config)?;
    let elapsed = now_millis.saturating_sub(action.start_millis);
    Ok(u64::try_from(elapsed).is_ok_and(|e| e > duration))
}

/// Epoch millis after which the action becomes due.
pub fn deadline_millis(action: &ExpiringAction, config: &ExpiryConfig) -> Result<i64> {
    let duration = duration_millis(action, config)?;
    Ok(action
        .start_millis
        .saturating_add(i64::try_from(duration).unwrap_or(i64::MAX)))
}

/// Render a duration as `mm:ss.S`: minutes are not wrapped into hours and
/// milliseconds are printed unpadded.
pub fn format_duration(millis: u64) -> String {
    let minutes = millis / 60_000;
    let seconds = (millis % 60_000) / 1_000;
    let ms = millis % 1_000;
    format!("{minutes:02}:{seconds:02}.{ms}")
}

/// Message recorded with the revert, e.g. `Pause expired after 00:05.0 (maintenance)`.
pub fn expiration_message(action: &ExpiringAction, duration_millis: u64) -> String {
    let msg = format!(
        "{} expired after {}",
        action.kind().action_name(),
        format_duration(duration_millis)
    );
    match action.api_request.message.as_deref() {
        Some(user_msg) if !user_msg.is_empty() => format!("{msg} ({user_msg})"),
        _ => msg,
    }
}
