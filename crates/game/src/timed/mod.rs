mod action;
mod scheduler;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use action::{
    begin, cancel, charge, claim, complete, expected_result, recover, speed_up, ActionCost,
    Currency, TimedActionError, TimedActionKind, TimedRequest,
};
pub use scheduler::{TimerHandle, TimerService};

/// Wall-clock unix time in whole seconds, the unit stored in timed slots.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn unix_to_system_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}
