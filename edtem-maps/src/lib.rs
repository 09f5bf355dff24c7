#![doc(issue_tracker_base_url = "https://github.com/chainbound/edtem/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Shared tables consulted by the pacing hook.
//!
//! Both tables exist once per address family: an IPv4 instance keyed by a 32-bit address and an
//! IPv6 instance keyed by a 128-bit address. Callers address them through [`std::net::IpAddr`]
//! and the variant picks the table.

mod bounded;
mod flow;
mod policy;

pub use bounded::BoundedMap;
pub use flow::FlowTable;
pub use policy::{Policy, PolicyStore};

/// Maximum number of entries in every table, per address family.
pub const MAX_ENTRIES: usize = 65_535;

/// Returned when a new key cannot be admitted because the table is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("table is at capacity ({capacity} entries)")]
pub struct CapacityError {
    /// Capacity of the full table.
    pub capacity: usize,
}
