use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::{BoundedMap, CapacityError, MAX_ENTRIES};

/// Throttling configuration for one source address.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Policy {
    /// Pacing rate. Zero means the link is down and every packet is dropped.
    pub throttle_rate_kbps: u32,
    /// Fixed latency added on top of pacing, in microseconds.
    pub delay_us: u32,
}

impl Policy {
    /// Creates a policy.
    pub const fn new(throttle_rate_kbps: u32, delay_us: u32) -> Self {
        Self { throttle_rate_kbps, delay_us }
    }

    /// A zero rate means the link is down.
    #[inline]
    pub const fn is_link_down(&self) -> bool {
        self.throttle_rate_kbps == 0
    }
}

/// Per-source policies, written by the control plane and read by the hook.
#[derive(Debug)]
pub struct PolicyStore {
    v4: BoundedMap<Ipv4Addr, Policy>,
    v6: BoundedMap<Ipv6Addr, Policy>,
}

impl PolicyStore {
    /// Creates a store with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }

    /// Creates a store holding at most `capacity` policies per address family.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { v4: BoundedMap::with_capacity(capacity), v6: BoundedMap::with_capacity(capacity) }
    }

    /// Returns the policy configured for `source`, if any.
    #[inline]
    pub fn lookup(&self, source: IpAddr) -> Option<Policy> {
        match source {
            IpAddr::V4(addr) => self.v4.get(&addr),
            IpAddr::V6(addr) => self.v6.get(&addr),
        }
    }

    /// Inserts or replaces the policy for `source`, returning the previous one.
    pub fn insert(&self, source: IpAddr, policy: Policy) -> Result<Option<Policy>, CapacityError> {
        match source {
            IpAddr::V4(addr) => self.v4.insert(addr, policy),
            IpAddr::V6(addr) => self.v6.insert(addr, policy),
        }
    }

    /// Removes the policy of `source`.
    pub fn remove(&self, source: IpAddr) -> Option<Policy> {
        match source {
            IpAddr::V4(addr) => self.v4.remove(&addr),
            IpAddr::V6(addr) => self.v6.remove(&addr),
        }
    }

    /// Number of IPv4 policies.
    pub fn len_v4(&self) -> usize {
        self.v4.len()
    }

    /// Number of IPv6 policies.
    pub fn len_v6(&self) -> usize {
        self.v6.len()
    }

    /// Capacity of each per-family table.
    pub fn capacity(&self) -> usize {
        self.v4.capacity()
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}
