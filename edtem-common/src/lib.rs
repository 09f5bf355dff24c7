#![doc(issue_tracker_base_url = "https://github.com/chainbound/edtem/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use std::time::{SystemTime, UNIX_EPOCH};

mod clock;
pub use clock::{Clock, ManualClock, MonotonicClock};

/// Returns the current UNIX timestamp in nanoseconds, or zero if the system clock is set before
/// the epoch.
#[inline]
pub fn unix_nanos() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or_default()
}

/// Time unit conversions.
pub mod constants {
    /// Nanoseconds per microsecond.
    pub const NS_PER_US: u64 = 1_000;
    /// Nanoseconds per millisecond.
    pub const NS_PER_MS: u64 = 1_000 * NS_PER_US;
    /// Nanoseconds per second.
    pub const NS_PER_SEC: u64 = 1_000 * NS_PER_MS;
}
