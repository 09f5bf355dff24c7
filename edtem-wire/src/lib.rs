#![doc(issue_tracker_base_url = "https://github.com/chainbound/edtem/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod classify;
mod ecn;
mod protocol;

pub use classify::{Classification, Classifier, EthernetClassifier};
pub use ecn::set_ecn_ce;
pub use protocol::Protocol;
