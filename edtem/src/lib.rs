#![doc(issue_tracker_base_url = "https://github.com/chainbound/edtem/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub use edtem_common::{Clock, ManualClock, MonotonicClock};
pub use edtem_control::{self as control, Controller, LinkState};
pub use edtem_hook::*;
pub use edtem_maps::{CapacityError, FlowTable, Policy, PolicyStore, MAX_ENTRIES};
pub use edtem_wire::*;

mod link;
pub use link::Link;
