//! Small shared helpers.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix time in milliseconds, zero if the clock is before the
/// epoch.
#[must_use]
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
