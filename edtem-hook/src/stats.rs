use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{Departure, DropReason};

/// Counters of the hook's decisions. Shared between the hook and whoever reports them.
#[derive(Debug, Default)]
pub struct HookStats {
    /// Packets seen
    packets: AtomicU64,
    /// Packets forwarded untouched because they were unclassified or had no policy
    passthrough: AtomicU64,
    /// Paced packets that could leave immediately
    forwarded: AtomicU64,
    /// Paced packets given a later departure time
    delayed: AtomicU64,
    /// Packets flagged congestion experienced
    ecn_marked: AtomicU64,
    dropped_link_down: AtomicU64,
    dropped_overflow: AtomicU64,
}

impl HookStats {
    #[inline]
    pub(crate) fn increment_packets(&self) {
        self.packets.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_passthrough(&self) {
        self.passthrough.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn increment_ecn_marked(&self) {
        self.ecn_marked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_departure(&self, departure: Departure) {
        let counter = match departure {
            Departure::Immediate => &self.forwarded,
            Departure::Delayed(_) => &self.delayed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_drop(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::LinkDown => &self.dropped_link_down,
            DropReason::QueueOverflow => &self.dropped_overflow,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Packets seen by the hook.
    #[inline]
    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    /// Packets dropped for any reason.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped_link_down.load(Ordering::Relaxed) +
            self.dropped_overflow.load(Ordering::Relaxed)
    }

    /// Reads all counters. Concurrent updates may land between individual reads.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets: self.packets.load(Ordering::Relaxed),
            passthrough: self.passthrough.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            delayed: self.delayed.load(Ordering::Relaxed),
            ecn_marked: self.ecn_marked.load(Ordering::Relaxed),
            dropped_link_down: self.dropped_link_down.load(Ordering::Relaxed),
            dropped_overflow: self.dropped_overflow.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`HookStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Packets seen.
    pub packets: u64,
    /// Packets without a policy or with an untracked protocol.
    pub passthrough: u64,
    /// Paced packets that left immediately.
    pub forwarded: u64,
    /// Paced packets given a later departure time.
    pub delayed: u64,
    /// Packets flagged congestion experienced.
    pub ecn_marked: u64,
    /// Drops on blocked links.
    pub dropped_link_down: u64,
    /// Drops past the time horizon or on a full flow table.
    pub dropped_overflow: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "packets: {} passthrough: {} forwarded: {} delayed: {} ecn: {} link_down: {} \
             overflow: {}",
            self.packets,
            self.passthrough,
            self.forwarded,
            self.delayed,
            self.ecn_marked,
            self.dropped_link_down,
            self.dropped_overflow
        )
    }
}
