#![doc(issue_tracker_base_url = "https://github.com/chainbound/edtem/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! The per-packet decision path of the link emulator.
//!
//! For every packet the [`Hook`] classifies the frame, looks up the policy of its source
//! address, lets the [`Pacer`] pick a departure time against the source's virtual clock and then
//! adds the policy's fixed latency. The outcome is a [`Disposition`] for the surrounding packet
//! pipeline, which is responsible for actually holding packets until their departure time.

use std::time::Duration;

use edtem_maps::CapacityError;
use thiserror::Error;

mod hook;
/// Fixed latency injection.
pub mod latency;
mod pacer;
mod stats;

pub use hook::Hook;
pub use pacer::{transmission_delay_ns, Departure, Pacer};
pub use stats::{HookStats, StatsSnapshot};

/// Default maximum queuing delay before a packet is dropped.
pub const DEFAULT_TIME_HORIZON: Duration = Duration::from_secs(2);
/// Default queuing delay from which packets are marked congestion experienced.
pub const DEFAULT_ECN_HORIZON: Duration = Duration::from_nanos(999_999_000_000);

/// Why the hook dropped a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum DropReason {
    /// The policy rate is zero.
    #[error("link down")]
    LinkDown,
    /// The flow is backed up past the time horizon, or a new flow could not be admitted.
    #[error("queue overflow")]
    QueueOverflow,
}

impl From<CapacityError> for DropReason {
    fn from(_: CapacityError) -> Self {
        Self::QueueOverflow
    }
}

/// The verdict handed back to the packet pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Send now.
    Forward,
    /// Hold until the given timestamp (in the hook's clock domain), then send.
    ForwardAt(u64),
    /// Discard the packet.
    Drop(DropReason),
}

impl Disposition {
    /// The disposition of a packet forwarded with whatever timestamp it carries.
    #[inline]
    pub const fn from_meta(meta: &PacketMeta) -> Self {
        if meta.tstamp == 0 {
            Self::Forward
        } else {
            Self::ForwardAt(meta.tstamp)
        }
    }

    /// Whether the packet is discarded.
    #[inline]
    pub const fn is_drop(&self) -> bool {
        matches!(self, Self::Drop(_))
    }

    /// The scheduled departure time, if any.
    pub const fn departure_ns(&self) -> Option<u64> {
        match self {
            Self::ForwardAt(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// Per-packet state that the hook reads and rewrites.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketMeta {
    /// Length of the packet in bytes.
    pub len: u32,
    /// Scheduled departure time in nanoseconds, zero when none is set.
    pub tstamp: u64,
    /// Set when the packet should be marked congestion experienced.
    pub congestion_experienced: bool,
}

impl PacketMeta {
    /// Metadata of an unscheduled packet of `len` bytes.
    pub const fn new(len: u32) -> Self {
        Self { len, tstamp: 0, congestion_experienced: false }
    }

    /// Sets a departure time that was already attached to the packet upstream.
    pub fn with_tstamp(mut self, tstamp: u64) -> Self {
        self.tstamp = tstamp;
        self
    }
}

/// Pacing thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacerOptions {
    /// Packets that would wait this long or longer are dropped.
    pub time_horizon: Duration,
    /// Packets that would wait this long or longer (but less than `time_horizon`) are marked
    /// congestion experienced.
    pub ecn_horizon: Duration,
}

impl PacerOptions {
    /// Sets the wait at which packets are dropped.
    pub fn with_time_horizon(mut self, horizon: Duration) -> Self {
        self.time_horizon = horizon;
        self
    }

    /// Sets the wait at which packets are marked.
    pub fn with_ecn_horizon(mut self, horizon: Duration) -> Self {
        self.ecn_horizon = horizon;
        self
    }
}

impl Default for PacerOptions {
    fn default() -> Self {
        Self { time_horizon: DEFAULT_TIME_HORIZON, ecn_horizon: DEFAULT_ECN_HORIZON }
    }
}
