use std::fmt;

use pnet::packet::ip::{IpNextHeaderProtocol, IpNextHeaderProtocols};

/// Transport protocol carried by a classified packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Protocol {
    /// Transmission Control Protocol.
    TCP,
    /// User Datagram Protocol.
    UDP,
    /// ICMP for IPv4, ICMPv6 for IPv6.
    ICMP,
    /// Any other protocol, by number.
    Other(u8),
}

impl Protocol {
    /// Whether packets of this protocol are subject to pacing.
    #[inline]
    pub const fn is_tracked(&self) -> bool {
        matches!(self, Self::TCP | Self::UDP | Self::ICMP)
    }
}

impl From<IpNextHeaderProtocol> for Protocol {
    fn from(proto: IpNextHeaderProtocol) -> Self {
        match proto {
            IpNextHeaderProtocols::Tcp => Self::TCP,
            IpNextHeaderProtocols::Udp => Self::UDP,
            IpNextHeaderProtocols::Icmp | IpNextHeaderProtocols::Icmpv6 => Self::ICMP,
            IpNextHeaderProtocol(other) => Self::Other(other),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TCP => f.write_str("tcp"),
            Self::UDP => f.write_str("udp"),
            Self::ICMP => f.write_str("icmp"),
            Self::Other(n) => write!(f, "proto-{n}"),
        }
    }
}
