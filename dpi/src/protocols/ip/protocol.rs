use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;

// IANA Assigned Internet Protocol Numbers
#[derive(Clone, Copy, Debug, Display, Eq, FromPrimitive, IntoPrimitive, PartialEq)]
#[repr(u8)]
pub enum IpNextLevelProtocol {
    #[strum(to_string = "ICMP")]
    ICMPv4 = 1,
    #[strum(to_string = "IGMP")]
    IGMP = 2,
    TCP = 6,
    UDP = 17,
    #[strum(to_string = "IPv6")]
    IPv6 = 41,
    GRE = 47,
    ESP = 50,
    AH = 51,
    #[strum(to_string = "ICMPv6")]
    ICMPv6 = 58,
    OSPF = 89,
    SCTP = 132,

    #[num_enum(catch_all)]
    Unknown(u8),
}
