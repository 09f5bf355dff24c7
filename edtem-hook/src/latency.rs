//! Fixed latency applied on top of pacing.

use edtem_common::constants::NS_PER_US;

use crate::PacketMeta;

/// Pushes the packet's departure back by `delay_us`.
///
/// A packet without a departure time is scheduled `delay_us` after `now`.
#[inline]
pub fn inject_delay(meta: &mut PacketMeta, delay_us: u32, now: u64) {
    let delay_ns = u64::from(delay_us) * NS_PER_US;

    let base = if meta.tstamp == 0 { now } else { meta.tstamp };
    meta.tstamp = base.saturating_add(delay_ns);
}
