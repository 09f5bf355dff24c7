use pnet::packet::{
    ethernet::{EtherTypes, MutableEthernetPacket},
    ipv4::{self, MutableIpv4Packet},
    ipv6::MutableIpv6Packet,
    MutablePacket,
};

/// ECN codepoint for congestion experienced.
const ECN_CE: u8 = 0b11;
const ECN_MASK: u8 = 0b11;

/// Marks the IP packet in `frame` as congestion experienced.
///
/// Only ECN-capable packets (ECT(0), ECT(1)) are marked; a Not-ECT packet is left untouched.
/// The IPv4 header checksum is recomputed. Returns whether the packet now carries CE.
pub fn set_ecn_ce(frame: &mut [u8]) -> bool {
    let Some(mut eth) = MutableEthernetPacket::new(frame) else {
        return false;
    };

    match eth.get_ethertype() {
        EtherTypes::Ipv4 => {
            let Some(mut ip) = MutableIpv4Packet::new(eth.payload_mut()) else {
                return false;
            };
            match ip.get_ecn() {
                0 => false,
                ECN_CE => true,
                _ => {
                    ip.set_ecn(ECN_CE);
                    let checksum = ipv4::checksum(&ip.to_immutable());
                    ip.set_checksum(checksum);
                    true
                }
            }
        }
        EtherTypes::Ipv6 => {
            let Some(mut ip) = MutableIpv6Packet::new(eth.payload_mut()) else {
                return false;
            };
            let traffic_class = ip.get_traffic_class();
            if traffic_class & ECN_MASK == 0 {
                return false;
            }
            ip.set_traffic_class(traffic_class | ECN_CE);
            true
        }
        other => {
            tracing::trace!(?other, "not marking non-ip frame");
            false
        }
    }
}
