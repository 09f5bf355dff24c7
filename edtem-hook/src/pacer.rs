use std::{net::IpAddr, sync::Arc, time::Duration};

use edtem_common::constants::NS_PER_SEC;
use edtem_maps::{FlowTable, Policy};
use tracing::{debug, trace};

use crate::{DropReason, PacerOptions, PacketMeta};

/// Where the pacer placed a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The flow is idle enough for the packet to leave now. Its timestamp is untouched.
    Immediate,
    /// The packet was scheduled to leave at the given time.
    Delayed(u64),
}

/// Time needed to put `len` bytes on a link paced at `rate_kbps`, in nanoseconds.
///
/// Computed as `len * 1e6 / rate`. No bits-per-byte factor is applied.
#[inline]
pub fn transmission_delay_ns(len: u32, rate_kbps: u32) -> u64 {
    u64::from(len) * (NS_PER_SEC / 1_000) / u64::from(rate_kbps)
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Earliest-departure-time pacer.
///
/// Every source address owns a virtual clock in the [`FlowTable`] holding the departure time of
/// its last packet. A new packet may leave once the link has had time to transmit the previous
/// one at the configured rate, so the clock advances by one transmission delay per packet and
/// never moves backwards.
///
/// Reading and advancing a source's clock are two separate table operations. Two packets of the
/// same source paced at the same instant can both observe the same clock and the flow will be
/// paced slightly faster than configured; nothing else is affected.
#[derive(Debug)]
pub struct Pacer {
    flows: Arc<FlowTable>,
    time_horizon_ns: u64,
    ecn_horizon_ns: u64,
}

impl Pacer {
    /// Creates a pacer with the default thresholds.
    pub fn new(flows: Arc<FlowTable>) -> Self {
        Self::with_options(flows, PacerOptions::default())
    }

    /// Creates a pacer with custom thresholds.
    pub fn with_options(flows: Arc<FlowTable>, options: PacerOptions) -> Self {
        Self {
            flows,
            time_horizon_ns: saturating_nanos(options.time_horizon),
            ecn_horizon_ns: saturating_nanos(options.ecn_horizon),
        }
    }

    /// The flow table holding every source's clock.
    pub fn flows(&self) -> &Arc<FlowTable> {
        &self.flows
    }

    /// Decides when the packet described by `meta` may leave, at time `now`.
    ///
    /// On [`Departure::Delayed`] the packet timestamp is set to the departure time, and the
    /// congestion flag may be raised if the wait exceeds the ECN horizon. Drops never touch the
    /// flow table.
    pub fn pace(
        &self,
        meta: &mut PacketMeta,
        source: IpAddr,
        policy: Policy,
        now: u64,
    ) -> Result<Departure, DropReason> {
        if policy.is_link_down() {
            return Err(DropReason::LinkDown);
        }

        let delay_ns = transmission_delay_ns(meta.len, policy.throttle_rate_kbps);
        let next = match self.flows.get(source) {
            Some(last) => last.saturating_add(delay_ns),
            None => 0,
        };

        let reference = now.max(meta.tstamp);
        if next <= reference {
            self.commit(source, reference)?;
            trace!(%source, len = meta.len, "packet leaves immediately");
            return Ok(Departure::Immediate);
        }

        let queued_ns = next - now;
        if queued_ns >= self.time_horizon_ns {
            debug!(%source, queued_ns, "flow backed up past the time horizon");
            return Err(DropReason::QueueOverflow);
        }

        self.commit(source, next)?;
        meta.tstamp = next;
        if queued_ns >= self.ecn_horizon_ns {
            meta.congestion_experienced = true;
        }

        trace!(%source, len = meta.len, departure_ns = next, queued_ns, "packet delayed");
        Ok(Departure::Delayed(next))
    }

    fn commit(&self, source: IpAddr, departure_ns: u64) -> Result<(), DropReason> {
        self.flows.set(source, departure_ns).map_err(|err| {
            debug!(%source, ?err, "cannot admit new flow");
            DropReason::from(err)
        })
    }
}
