use std::net::IpAddr;

use pnet::packet::{
    ethernet::{EtherTypes, EthernetPacket},
    ipv4::Ipv4Packet,
    ipv6::Ipv6Packet,
    Packet,
};

use crate::Protocol;

const IPV4_MIN_HEADER_BYTES: usize = 20;

/// What the hook needs to know about a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Source address of the packet.
    pub source: IpAddr,
    /// Transport protocol of the packet.
    pub protocol: Protocol,
}

/// Extracts the source address and transport protocol from a raw frame.
///
/// Returning `None` means the packet is not IPv4 or IPv6 (or is malformed) and is of no interest
/// to the hook.
pub trait Classifier: Send + Sync {
    fn classify(&self, frame: &[u8]) -> Option<Classification>;
}

/// Classifier for Ethernet II frames.
///
/// Only the fixed IP headers are inspected; IPv6 extension headers are not followed, so an IPv6
/// packet whose first next-header is an extension is reported as [`Protocol::Other`].
#[derive(Debug, Default, Clone, Copy)]
pub struct EthernetClassifier;

impl Classifier for EthernetClassifier {
    fn classify(&self, frame: &[u8]) -> Option<Classification> {
        let eth = EthernetPacket::new(frame)?;

        match eth.get_ethertype() {
            EtherTypes::Ipv4 => classify_ipv4(eth.payload()),
            EtherTypes::Ipv6 => classify_ipv6(eth.payload()),
            _ => None,
        }
    }
}

fn classify_ipv4(packet: &[u8]) -> Option<Classification> {
    let ip = Ipv4Packet::new(packet)?;

    let header_len = ip.get_header_length() as usize * 4;
    if ip.get_version() != 4 || header_len < IPV4_MIN_HEADER_BYTES {
        return None;
    }
    if packet.len() < header_len {
        return None;
    }

    Some(Classification {
        source: IpAddr::V4(ip.get_source()),
        protocol: ip.get_next_level_protocol().into(),
    })
}

fn classify_ipv6(packet: &[u8]) -> Option<Classification> {
    let ip = Ipv6Packet::new(packet)?;
    if ip.get_version() != 6 {
        return None;
    }

    Some(Classification {
        source: IpAddr::V6(ip.get_source()),
        protocol: ip.get_next_header().into(),
    })
}
