//! Input bound checks shared by the handlers.
//!
//! Failures carry a symbolic key (`tag_length`, `note_length`, ...) that the
//! front-end localises; bounds come from [`crate::config::Config`].

use chrono::Duration;
use validator::Validate;

use crate::error::CoreError;

/// Run derive-based validation, reporting any failure under `key`.
pub fn validate_request<T: Validate>(request: &T, key: &'static str) -> Result<(), CoreError> {
    request.validate().map_err(|e| {
        tracing::debug!(key, errors = %e, "Request validation failed");
        CoreError::Validation(key)
    })
}

/// Check a trimmed value's character count against inclusive bounds.
pub fn check_length(key: &'static str, value: &str, min: usize, max: usize) -> Result<(), CoreError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(CoreError::Validation(key));
    }
    Ok(())
}

/// Upper bound on a requested grant duration, roughly a century.
pub const MAX_DURATION_MS: i64 = 100 * 365 * 24 * 60 * 60 * 1000;

/// Turn a requested duration into a [`Duration`], rejecting non-positive or
/// oversized values.
pub fn check_duration(duration_ms: Option<i64>) -> Result<Option<Duration>, CoreError> {
    match duration_ms {
        None => Ok(None),
        Some(ms) if ms <= 0 || ms > MAX_DURATION_MS => Err(CoreError::Validation("duration_out_of_range")),
        Some(ms) => Ok(Some(Duration::milliseconds(ms))),
    }
}

/// Reasons may be empty but never exceed `max`.
pub fn check_reason(value: &str, max: usize) -> Result<(), CoreError> {
    check_length("reason_length", value, 0, max)
}
