use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::{BoundedMap, CapacityError, MAX_ENTRIES};

/// Last scheduled departure time of every source, in nanoseconds.
///
/// Entries are created on the first packet of a source and live as long as the table.
#[derive(Debug)]
pub struct FlowTable {
    v4: BoundedMap<Ipv4Addr, u64>,
    v6: BoundedMap<Ipv6Addr, u64>,
}

impl FlowTable {
    /// Creates a table with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }

    /// Creates a table tracking at most `capacity` sources per address family.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { v4: BoundedMap::with_capacity(capacity), v6: BoundedMap::with_capacity(capacity) }
    }

    /// Returns the last departure timestamp recorded for `source`.
    #[inline]
    pub fn get(&self, source: IpAddr) -> Option<u64> {
        match source {
            IpAddr::V4(addr) => self.v4.get(&addr),
            IpAddr::V6(addr) => self.v6.get(&addr),
        }
    }

    /// Records `departure_ns` for `source`. Fails only when `source` is new and its family's
    /// table is full.
    #[inline]
    pub fn set(&self, source: IpAddr, departure_ns: u64) -> Result<(), CapacityError> {
        match source {
            IpAddr::V4(addr) => self.v4.insert(addr, departure_ns).map(drop),
            IpAddr::V6(addr) => self.v6.insert(addr, departure_ns).map(drop),
        }
    }

    /// Number of tracked IPv4 sources.
    pub fn len_v4(&self) -> usize {
        self.v4.len()
    }

    /// Number of tracked IPv6 sources.
    pub fn len_v6(&self) -> usize {
        self.v6.len()
    }

    /// Capacity of each per-family table.
    pub fn capacity(&self) -> usize {
        self.v4.capacity()
    }
}

impl Default for FlowTable {
    fn default() -> Self {
        Self::new()
    }
}
