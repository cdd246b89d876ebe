use nom::IResult;
use nom::Parser;
use nom::number::be_u16;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;

pub const LENGTH_BYTES: usize = 2;

// IANA ARP Parameters, Hardware Types
#[derive(Clone, Copy, Debug, Display, Eq, FromPrimitive, IntoPrimitive, PartialEq)]
#[repr(u16)]
pub enum HardwareType {
    Ethernet = 1,
    #[strum(to_string = "IEEE 802")]
    Ieee802 = 6,
    #[strum(to_string = "Frame Relay")]
    FrameRelay = 15,
    #[strum(to_string = "IEEE 1394")]
    Ieee1394 = 24,
    #[strum(to_string = "InfiniBand")]
    InfiniBand = 32,

    #[num_enum(catch_all)]
    Unknown(u16),
}

pub fn parse(input: &[u8]) -> IResult<&[u8], HardwareType> {
    let (input, number) = be_u16().parse(input)?;

    Ok((input, HardwareType::from(number)))
}
