use crate::layer::{Field, FieldValue, Layer};
use crate::protocols::ethernet::ether_type::EtherType;
use crate::protocols::ethernet::mac::MacAddress;
use crate::protocols::{ProtocolData, ProtocolId};
use nom::IResult;
use thiserror::Error;

// Ethernet II
// IEEE 802.3: https://standards.ieee.org/ieee/802.3/10422/

pub const HEADER_LENGTH: usize = 14;
pub const LAYER_NAME: &str = "Ethernet";
pub const UNKNOWN_LABEL: &str = "Unknown";

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    // Destination MAC. 6 bytes
    let (rest, destination_mac) = mac::parse(bytes)?;
    // Source MAC. 6 bytes
    let (rest, source_mac) = mac::parse(rest)?;
    // EtherType. 2 bytes
    let (rest, ether_type) = ether_type::parse(rest)?;

    let protocol = Ethernet {
        destination_mac,
        source_mac,
        ether_type,
    };

    Ok((rest, ProtocolData::Ethernet(protocol)))
}

pub fn best_children(ethernet: &Ethernet) -> Option<ProtocolId> {
    match ethernet.ether_type {
        EtherType::Ipv4 => Some(ProtocolId::IPv4),
        EtherType::Arp => Some(ProtocolId::Arp),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ethernet {
    pub destination_mac: MacAddress,
    pub source_mac: MacAddress,
    pub ether_type: EtherType,
}

impl Ethernet {
    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::Ethernet.tag();
        let mut layer = Layer::new(LAYER_NAME);

        layer.push(Field::new("Destination MAC", self.destination_mac.clone(), tag));
        layer.push(Field::new("Source MAC", self.source_mac.clone(), tag));
        layer.push(
            Field::new(
                "Type",
                FieldValue::Hex(u64::from(u16::from(self.ether_type))),
                tag,
            )
            .describe(self.ether_type.to_string()),
        );

        layer
    }

    pub fn summary(&self) -> String {
        format!(
            "Ethertype 0x{:04x} ({})",
            u16::from(self.ether_type),
            self.ether_type
        )
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum EthernetError {
    #[error("Failed to decode MAC address from hex")]
    MacFailedHexDecode,

    #[error("MAC address must contain 6 bytes")]
    MacInvalidBytesLength,

    #[error("MAC address string has invalid length")]
    MacInvalidStringLength,
}

pub mod ether_type;
pub mod mac;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::{decode_hex, layers, record};

    #[test]
    fn test_ethernet_wire_order() {
        let frame = decode_hex("00 1A 8C 10 AD 30 00 1E 68 51 4F A9 08 06 00 01 08 00 06 04 00 02 00 1E 68 51 4F A9 AC 10 FF 01 00 1A 8C 10 AD 30 AC 10 00 01");
        let layers = layers(&frame);

        let actual = match layers[0].clone() {
            ProtocolData::Ethernet(value) => value,
            _ => panic!(),
        };

        let expected = Ethernet {
            destination_mac: MacAddress::try_from("00:1A:8C:10:AD:30").unwrap(),
            source_mac: MacAddress::try_from("00:1E:68:51:4F:A9").unwrap(),
            ether_type: EtherType::Arp,
        };

        assert_eq!(actual, expected);

        let layer = actual.to_layer();
        let names: Vec<&str> = layer.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Destination MAC", "Source MAC", "Type"]);
        assert_eq!(layer.fields[2].value.to_string(), "0x806");
        assert_eq!(layer.fields[2].description.as_deref(), Some("ARP"));
    }

    #[test]
    fn test_unknown_ether_type() {
        let frame = decode_hex("33 33 00 00 00 02 40 61 86 9A F1 F5 86 DD 60 00 00 00 00 10 3A FF");
        let record = record(&frame);

        assert_eq!(record.protocol, "Unknown");
        assert_eq!(record.info, "Ethertype 0x86dd (IPv6)");
        assert_eq!(record.source, "40:61:86:9A:F1:F5");
        assert_eq!(record.target, "33:33:00:00:00:02");
        assert_eq!(record.layers.len(), 2);
    }

    #[test]
    fn test_vendor_specific_ether_type() {
        let frame = decode_hex("FF FF FF FF FF FF 00 1E 68 51 4F A9 88 B5 00 00");
        let layers = layers(&frame);

        match &layers[0] {
            ProtocolData::Ethernet(value) => {
                assert_eq!(value.ether_type, EtherType::Unknown(0x88B5));
                assert!(value.destination_mac.is_broadcast());
            },
            _ => panic!(),
        }
    }
}
