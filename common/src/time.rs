// Time types used across the forge.
//
// Operations never read the wall clock: every timestamp recorded in state
// comes from the caller's execution context. The helpers below are only for
// hosts (the scenario runner) that need to seed such a context.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

// Block heights of the hosting ledger
pub type BlockHeight = u64;

#[inline]
pub fn get_current_time() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

// Return timestamp in seconds
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    get_current_time().as_secs()
}
