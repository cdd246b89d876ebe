use crate::parser::ParserError;
use crate::protocols::ethernet::EthernetError;
use nom::IResult;
use nom::Parser;
use nom::bytes::take;
use std::fmt::Formatter;

pub const LENGTH_BYTES: usize = 6;
pub const BROADCAST_MAC: [u8; LENGTH_BYTES] = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct MacAddress(pub [u8; LENGTH_BYTES]);

impl MacAddress {
    pub fn is_broadcast(&self) -> bool {
        self.0.eq(&BROADCAST_MAC)
    }

    pub fn is_multicast(&self) -> bool {
        if self.is_broadcast() {
            return false;
        }

        self.0[0] & 0b00000001 == 1
    }
}

impl From<[u8; LENGTH_BYTES]> for MacAddress {
    fn from(value: [u8; LENGTH_BYTES]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for MacAddress {
    type Error = EthernetError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = <[u8; LENGTH_BYTES]>::try_from(value)
            .map_err(|_| EthernetError::MacInvalidBytesLength)?;

        Ok(MacAddress(bytes))
    }
}

impl TryFrom<&str> for MacAddress {
    type Error = EthernetError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let s = value.replace([':', '.', '-'], "");
        let bytes = hex::decode(&s).map_err(|_| EthernetError::MacFailedHexDecode)?;
        let bytes = <[u8; LENGTH_BYTES]>::try_from(bytes)
            .map_err(|_| EthernetError::MacInvalidStringLength)?;

        Ok(Self(bytes))
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let octets: Vec<String> = self.0.iter().map(|byte| format!("{:02X}", byte)).collect();

        write!(f, "{}", octets.join(":"))
    }
}

pub fn parse(input: &[u8]) -> IResult<&[u8], MacAddress> {
    let (rest, mac_bytes) = take(LENGTH_BYTES).parse(input)?;
    let mac = match MacAddress::try_from(mac_bytes) {
        Ok(mac) => mac,
        Err(_) => return Err(ParserError::ErrorVerify.to_nom(input)),
    };

    Ok((rest, mac))
}
