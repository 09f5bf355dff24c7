#![doc(issue_tracker_base_url = "https://github.com/chainbound/edtem/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Writes link policies into the [`PolicyStore`] read by the pacing hook.
//!
//! Links are configured per target prefix. The controller remembers the bandwidth, latency and
//! blocked state of every target and rewrites the policy of each address in the prefix whenever
//! one of them changes. IPv4 targets are mirrored into the IPv6 table under `fd00::/64`, where
//! each octet of the IPv4 address becomes one 16-bit group (`10.0.0.1` maps to `fd00::a:0:0:1`).

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    sync::Arc,
};

use edtem_maps::{CapacityError, Policy, PolicyStore};
use ipnet::IpNet;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

/// Bandwidth of a target before it is configured.
pub const DEFAULT_BANDWIDTH_KBPS: u32 = 10_000_000;
/// Latency of a target before it is configured.
pub const DEFAULT_LATENCY_US: u32 = 0;

/// Control-plane errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The target covers more addresses than the policy table can hold.
    #[error("target {target} spans more addresses than the policy store holds ({capacity})")]
    TargetTooLarge { target: IpNet, capacity: usize },
    /// The policy table filled up while writing the target.
    #[error("policy store error: {0}")]
    Capacity(#[from] CapacityError),
    /// No link state is recorded for the target.
    #[error("unknown target: {0}")]
    UnknownTarget(IpNet),
}

/// Result alias for control-plane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration of one emulated link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    /// Configured rate, kept while the link is blocked.
    pub bandwidth_kbps: u32,
    /// Added latency in microseconds.
    pub delay_us: u32,
    /// A blocked link drops everything but keeps its bandwidth for when it is unblocked.
    pub blocked: bool,
}

impl LinkState {
    /// The policy enforced by the hook for this state.
    pub fn policy(&self) -> Policy {
        let rate = if self.blocked { 0 } else { self.bandwidth_kbps };
        Policy::new(rate, self.delay_us)
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            bandwidth_kbps: DEFAULT_BANDWIDTH_KBPS,
            delay_us: DEFAULT_LATENCY_US,
            blocked: false,
        }
    }
}

/// The IPv6 address mirroring `addr`.
pub fn mirrored_ipv6(addr: Ipv4Addr) -> Ipv6Addr {
    let [a, b, c, d] = addr.octets();
    Ipv6Addr::new(0xfd00, 0, 0, 0, a.into(), b.into(), c.into(), d.into())
}

/// Control plane for one policy store.
#[derive(Debug)]
pub struct Controller {
    policies: Arc<PolicyStore>,
    links: Mutex<FxHashMap<IpNet, LinkState>>,
}

impl Controller {
    /// Creates a controller writing into `policies`.
    pub fn new(policies: Arc<PolicyStore>) -> Self {
        Self { policies, links: Mutex::new(FxHashMap::default()) }
    }

    /// The store the hook reads from.
    pub fn policies(&self) -> &Arc<PolicyStore> {
        &self.policies
    }

    /// Current state of `target`, if it was ever configured.
    pub fn link(&self, target: IpNet) -> Option<LinkState> {
        self.links.lock().get(&target.trunc()).copied()
    }

    /// Sets the rate of every address in `target`.
    pub fn set_bandwidth(&self, target: IpNet, bandwidth_kbps: u32) -> Result<()> {
        self.update(target, |link| link.bandwidth_kbps = bandwidth_kbps)
    }

    /// Sets the added latency of every address in `target`.
    pub fn set_latency(&self, target: IpNet, delay_us: u32) -> Result<()> {
        self.update(target, |link| link.delay_us = delay_us)
    }

    /// Drops all traffic from `target` until [`Controller::unblock_link`] is called.
    pub fn block_link(&self, target: IpNet) -> Result<()> {
        self.update(target, |link| link.blocked = true)
    }

    /// Restores the remembered rate of `target`.
    pub fn unblock_link(&self, target: IpNet) -> Result<()> {
        self.update(target, |link| link.blocked = false)
    }

    /// Forgets `target` and deletes the policies of all its addresses.
    pub fn remove(&self, target: IpNet) -> Result<LinkState> {
        let target = target.trunc();
        let mut links = self.links.lock();
        let state = links.remove(&target).ok_or(Error::UnknownTarget(target))?;

        for addr in self.addresses(target)? {
            self.policies.remove(addr);
        }

        debug!(%target, "removed link");
        Ok(state)
    }

    fn update(&self, target: IpNet, f: impl FnOnce(&mut LinkState)) -> Result<()> {
        let target = target.trunc();
        let addresses = self.addresses(target)?;

        let mut links = self.links.lock();
        let mut state = links.get(&target).copied().unwrap_or_default();
        f(&mut state);

        let policy = state.policy();
        debug!(%target, ?state, addresses = addresses.len(), "updating link");

        for addr in addresses {
            trace!(%addr, ?policy, "writing policy");
            self.policies.insert(addr, policy).map_err(|err| {
                warn!(%target, %addr, ?err, "policy store exhausted, link partially applied");
                err
            })?;
        }

        links.insert(target, state);
        Ok(())
    }

    /// Every address a target covers, network and broadcast included, plus the IPv6 mirror of
    /// each IPv4 address.
    fn addresses(&self, target: IpNet) -> Result<Vec<IpAddr>> {
        let capacity = self.policies.capacity();
        let host_bits = u32::from(target.max_prefix_len() - target.prefix_len());
        let hosts = 1u128.checked_shl(host_bits).unwrap_or(u128::MAX);
        if hosts > capacity as u128 {
            return Err(Error::TargetTooLarge { target, capacity });
        }

        let addresses = match target {
            IpNet::V4(net) => (u32::from(net.network())..=u32::from(net.broadcast()))
                .map(Ipv4Addr::from)
                .flat_map(|addr| [IpAddr::V4(addr), IpAddr::V6(mirrored_ipv6(addr))])
                .collect(),
            IpNet::V6(net) => (u128::from(net.network())..=u128::from(net.broadcast()))
                .map(|addr| IpAddr::V6(addr.into()))
                .collect(),
        };

        Ok(addresses)
    }
}
