use crate::layer::Layer;
use crate::parser::{DecodeError, ParseFn, PortFn};
use strum_macros::Display;

/// Guide: How to Add a Protocol
/// 1. Add it to the `ProtocolId` enum and give it a lowercase tag in `ProtocolId::tag`.
/// 2. Add a parsing method with the signature `ParseFn` to the `ProtocolId::parse` method. The parsing method itself should be placed in your module, e.g., `protocols::custom_protocol`.
/// 3. Put the size of the fixed header into `ProtocolId::minimum_length`.
/// 4. If the parent decides by ports, add a `check_ports` function and link it in `ProtocolId::check_ports`, then list the protocol in the parent's `ProtocolId::children`.
/// 5. Add a variant to `ProtocolData` and render it in `to_layer`, `label` and `summary`.
///
/// That's it! After that, write tests and verify that parsing works correctly.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ProtocolId {
    Ethernet,

    #[strum(to_string = "ARP")]
    Arp,

    #[strum(to_string = "IP")]
    IPv4,

    #[strum(to_string = "ICMP")]
    ICMPv4,
    TCP,
    UDP,

    DNS,
    #[strum(to_string = "DHCP")]
    DHCPv4,
    RIP,
    HTTP,
}

impl ProtocolId {
    pub fn parse(&self) -> ParseFn {
        match self {
            Self::Ethernet => ethernet::parse,
            Self::Arp => arp::parse,
            Self::IPv4 => ipv4::parse,
            Self::ICMPv4 => icmpv4::parse,
            Self::TCP => tcp::parse,
            Self::UDP => udp::parse,
            Self::DNS => dns::parse,
            Self::DHCPv4 => dhcpv4::parse,
            Self::RIP => rip::parse,
            Self::HTTP => http::parse,
        }
    }

    pub fn minimum_length(&self) -> usize {
        match self {
            Self::Ethernet => ethernet::HEADER_LENGTH,
            Self::Arp => arp::PACKET_LENGTH,
            Self::IPv4 => ipv4::HEADER_MIN_LENGTH,
            Self::ICMPv4 => icmpv4::HEADER_LENGTH,
            Self::TCP => tcp::HEADER_MIN_LENGTH,
            Self::UDP => udp::HEADER_LENGTH,
            Self::DNS => dns::HEADER_LENGTH,
            Self::DHCPv4 => dhcpv4::HEADER_LENGTH,
            Self::RIP => rip::HEADER_LENGTH,
            Self::HTTP => 0,
        }
    }

    /// Runs the protocol parser over the bytes, converting nom errors into `DecodeError`.
    pub fn decode<'a>(
        &self, bytes: &'a [u8],
    ) -> Result<(&'a [u8], ProtocolData), DecodeError> {
        let needed = self.minimum_length();
        if bytes.len() < needed {
            return Err(DecodeError::BufferTooShort {
                protocol: *self,
                needed,
                available: bytes.len(),
            });
        }

        self.parse()(bytes).map_err(|error| DecodeError::from_nom(*self, bytes.len(), error))
    }

    pub fn children(&self) -> Option<Vec<Self>> {
        match self {
            Self::Ethernet => Some(vec![Self::IPv4, Self::Arp]),
            Self::Arp => None,

            Self::IPv4 => Some(vec![Self::TCP, Self::UDP, Self::ICMPv4]),
            Self::ICMPv4 => None,

            Self::TCP => Some(vec![Self::HTTP]),
            // Priority order, the first matching port rule wins
            Self::UDP => Some(vec![Self::DNS, Self::DHCPv4, Self::RIP]),

            Self::DNS => None,
            Self::DHCPv4 => None,
            Self::RIP => None,
            Self::HTTP => None,
        }
    }

    pub fn check_ports(&self) -> Option<PortFn> {
        match self {
            Self::DNS => Some(dns::check_ports),
            Self::DHCPv4 => Some(dhcpv4::check_ports),
            Self::RIP => Some(rip::check_ports),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Ethernet => "ethernet",
            Self::Arp => "arp",
            Self::IPv4 => "ip",
            Self::ICMPv4 => "icmp",
            Self::TCP => "tcp",
            Self::UDP => "udp",
            Self::DNS => "dns",
            Self::DHCPv4 => "dhcp",
            Self::RIP => "rip",
            Self::HTTP => "http",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProtocolData {
    Ethernet(ethernet::Ethernet),

    Arp(arp::Arp),

    IPv4(ipv4::IPv4),

    ICMPv4(icmpv4::ICMPv4),
    TCP(tcp::TCP),
    UDP(udp::UDP),

    DNS(dns::DNS),
    DHCPv4(dhcpv4::DHCPv4),
    RIP(rip::RIP),
    HTTP(http::HTTP),
}

impl ProtocolData {
    pub fn id(&self) -> ProtocolId {
        match self {
            Self::Ethernet(_) => ProtocolId::Ethernet,
            Self::Arp(_) => ProtocolId::Arp,
            Self::IPv4(_) => ProtocolId::IPv4,
            Self::ICMPv4(_) => ProtocolId::ICMPv4,
            Self::TCP(_) => ProtocolId::TCP,
            Self::UDP(_) => ProtocolId::UDP,
            Self::DNS(_) => ProtocolId::DNS,
            Self::DHCPv4(_) => ProtocolId::DHCPv4,
            Self::RIP(_) => ProtocolId::RIP,
            Self::HTTP(_) => ProtocolId::HTTP,
        }
    }

    pub fn best_children(&self, payload: &[u8]) -> Option<ProtocolId> {
        match self {
            Self::Ethernet(value) => ethernet::best_children(value),
            Self::IPv4(value) => ipv4::best_children(value),
            Self::TCP(_) => tcp::best_children(payload),
            Self::UDP(value) => udp::best_children(value),
            Self::Arp(_)
            | Self::ICMPv4(_)
            | Self::DNS(_)
            | Self::DHCPv4(_)
            | Self::RIP(_)
            | Self::HTTP(_) => None,
        }
    }

    /// Protocol label of a record whose deepest layer is this one.
    pub fn label(&self) -> String {
        match self {
            Self::Ethernet(value) if ethernet::best_children(value).is_none() => {
                ethernet::UNKNOWN_LABEL.to_string()
            },
            _ => self.id().to_string(),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Self::Ethernet(value) => value.summary(),
            Self::Arp(value) => value.summary(),
            Self::IPv4(value) => value.summary(),
            Self::ICMPv4(value) => value.summary(),
            Self::TCP(value) => value.summary(),
            Self::UDP(value) => value.summary(),
            Self::DNS(value) => value.summary(),
            Self::DHCPv4(value) => value.summary(),
            Self::RIP(value) => value.summary(),
            Self::HTTP(value) => value.summary(),
        }
    }

    pub fn to_layer(&self) -> Layer {
        match self {
            Self::Ethernet(value) => value.to_layer(),
            Self::Arp(value) => value.to_layer(),
            Self::IPv4(value) => value.to_layer(),
            Self::ICMPv4(value) => value.to_layer(),
            Self::TCP(value) => value.to_layer(),
            Self::UDP(value) => value.to_layer(),
            Self::DNS(value) => value.to_layer(),
            Self::DHCPv4(value) => value.to_layer(),
            Self::RIP(value) => value.to_layer(),
            Self::HTTP(value) => value.to_layer(),
        }
    }
}

pub mod arp;
pub mod dhcpv4;
pub mod dns;
pub mod ethernet;
pub mod http;
pub mod icmpv4;
pub mod ip {
    pub mod address;
    pub mod protocol;
}
pub mod ipv4;
pub mod rip;
pub mod tcp;
pub mod udp;
