use nom::IResult;
use nom::Parser;
use nom::number::be_u16;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;

pub const LENGTH_BYTES: usize = 2;

#[derive(Clone, Copy, Debug, Display, Eq, FromPrimitive, IntoPrimitive, PartialEq)]
#[repr(u16)]
pub enum EtherType {
    #[strum(to_string = "IPv4")]
    Ipv4 = 0x0800,
    #[strum(to_string = "ARP")]
    Arp = 0x0806,
    #[strum(to_string = "Frame Relay ARP")]
    ArpFrameRelay = 0x0808,
    #[strum(to_string = "Reverse ARP")]
    ArpReverse = 0x8035,
    #[strum(to_string = "VLAN")]
    Vlan = 0x8100,
    #[strum(to_string = "IPv6")]
    Ipv6 = 0x86DD,
    #[strum(to_string = "LLDP")]
    Lldp = 0x88CC,

    #[num_enum(catch_all)]
    Unknown(u16),
}

pub fn parse(input: &[u8]) -> IResult<&[u8], EtherType> {
    let (input, ether_type) = be_u16().parse(input)?;

    Ok((input, EtherType::from(ether_type)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ether_type_round_values() {
        assert_eq!(EtherType::from(0x0800), EtherType::Ipv4);
        assert_eq!(EtherType::from(0x1234), EtherType::Unknown(0x1234));
        assert_eq!(u16::from(EtherType::Lldp), 0x88CC);
        assert_eq!(u16::from(EtherType::Unknown(0x1234)), 0x1234);
        assert_eq!(EtherType::Unknown(0x1234).to_string(), "Unknown");
    }
}
