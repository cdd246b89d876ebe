use crate::layer::{Field, FieldValue, Layer};
use crate::parser::ParserError;
use crate::protocols::arp::hardware_type::HardwareType;
use crate::protocols::arp::operation::Operation;
use crate::protocols::ethernet::ether_type::EtherType;
use crate::protocols::ethernet::mac::MacAddress;
use crate::protocols::ip::address;
use crate::protocols::{ProtocolData, ProtocolId, ethernet};
use nom::IResult;
use nom::Parser;
use nom::number::be_u8;
use std::net::Ipv4Addr;

// ARP Protocol
// RFC 826: https://datatracker.ietf.org/doc/html/rfc826
pub const PACKET_LENGTH: usize = 28;
pub const LAYER_NAME: &str = "Address Resolution Protocol";

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    if bytes.len() < PACKET_LENGTH {
        return Err(ParserError::Incomplete.to_nom(bytes));
    };

    // Cutting Ethernet padding & FCS
    let bytes = bytes.get(..PACKET_LENGTH).unwrap_or(bytes);

    // HTYPE
    let (rest, hardware_type) = hardware_type::parse(bytes)?;

    // PTYPE
    let (rest, protocol_type) = ethernet::ether_type::parse(rest)?;

    // HLEN. The fixed layout below holds only for 6-byte hardware addresses
    let (rest, hardware_address_length) = be_u8().parse(rest)?;
    if hardware_address_length != ethernet::mac::LENGTH_BYTES as u8 {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }

    // PLEN
    let (rest, protocol_address_length) = be_u8().parse(rest)?;
    if protocol_address_length != address::V4_LENGTH_BYTES as u8 {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }

    // OP
    let (rest, operation) = operation::parse(rest)?;

    // SENDER_HARDWARE_ADDRESS
    let (rest, sender_mac) = ethernet::mac::parse(rest)?;
    // SENDER_PROTOCOL_ADDRESS
    let (rest, sender_ip) = address::v4_parse(rest)?;
    // TARGET_HARDWARE_ADDRESS
    let (rest, target_mac) = ethernet::mac::parse(rest)?;
    // TARGET_PROTOCOL_ADDRESS
    let (rest, target_ip) = address::v4_parse(rest)?;

    let arp = Arp {
        hardware_type,
        protocol_type,
        hardware_address_length,
        protocol_address_length,
        operation,
        sender_mac,
        sender_ip,
        target_mac,
        target_ip,
    };

    Ok((rest, ProtocolData::Arp(arp)))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Arp {
    pub hardware_type: HardwareType,
    pub protocol_type: EtherType,

    pub hardware_address_length: u8,
    pub protocol_address_length: u8,

    pub operation: Operation,

    pub sender_mac: MacAddress,
    pub sender_ip: Ipv4Addr,

    pub target_mac: MacAddress,
    pub target_ip: Ipv4Addr,
}

impl Arp {
    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::Arp.tag();
        let mut layer = Layer::new(LAYER_NAME);

        layer.push(
            Field::new("Hardware Type", u16::from(self.hardware_type), tag)
                .describe(self.hardware_type.to_string()),
        );
        layer.push(
            Field::new(
                "Protocol Type",
                FieldValue::Hex(u64::from(u16::from(self.protocol_type))),
                tag,
            )
            .describe(self.protocol_type.to_string()),
        );
        layer.push(Field::new("Hardware Size", self.hardware_address_length, tag));
        layer.push(Field::new("Protocol Size", self.protocol_address_length, tag));
        layer.push(Field::new("Operation", self.operation.to_string(), tag));
        layer.push(Field::new("Sender MAC", self.sender_mac.clone(), tag));
        layer.push(Field::new("Sender IP", self.sender_ip, tag));
        layer.push(Field::new("Target MAC", self.target_mac.clone(), tag));
        layer.push(Field::new("Target IP", self.target_ip, tag));

        layer
    }

    pub fn summary(&self) -> String {
        format!("{} from {}", self.operation, self.sender_ip)
    }
}

pub mod hardware_type;
pub mod operation;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::{decode_hex, layers, record};

    #[test]
    fn test_arp_without_ethernet_padding() {
        let frame = decode_hex("00 1A 8C 10 AD 30 00 1E 68 51 4F A9 08 06 00 01 08 00 06 04 00 02 00 1E 68 51 4F A9 AC 10 FF 01 00 1A 8C 10 AD 30 AC 10 00 01");
        let layers = layers(&frame);

        let actual_arp = match layers[1].clone() {
            ProtocolData::Arp(value) => value,
            _ => panic!(),
        };

        let expected_arp = Arp {
            hardware_type: HardwareType::Ethernet,
            protocol_type: EtherType::Ipv4,
            hardware_address_length: ethernet::mac::LENGTH_BYTES as u8,
            protocol_address_length: address::V4_LENGTH_BYTES as u8,
            operation: Operation::Reply,
            sender_mac: MacAddress::try_from("00:1E:68:51:4F:A9").unwrap(),
            sender_ip: Ipv4Addr::new(172, 16, 255, 1),
            target_mac: MacAddress::try_from("00:1A:8C:10:AD:30").unwrap(),
            target_ip: Ipv4Addr::new(172, 16, 0, 1),
        };

        assert_eq!(actual_arp, expected_arp);
    }

    #[test]
    fn test_arp_with_ethernet_padding() {
        let frame = decode_hex("00 1E 68 51 4F A9 00 1A 8C 10 AD 30 08 06 00 01 08 00 06 04 00 01 00 1A 8C 10 AD 30 AC 10 00 01 00 00 00 00 00 00 AC 10 FF 01 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00");
        let record = record(&frame);

        assert_eq!(record.protocol, "ARP");
        assert_eq!(record.info, "REQUEST from 172.16.0.1");
        assert_eq!(record.source, "172.16.0.1");
        assert_eq!(record.target, "172.16.255.1");
        assert_eq!(record.length, 60);

        let layer = &record.layers[2];
        assert_eq!(layer.name, "Address Resolution Protocol");
        assert_eq!(layer.fields.len(), 9);
        assert_eq!(
            layer.field("Target MAC").unwrap().value.to_string(),
            "00:00:00:00:00:00"
        );
    }

    #[test]
    fn test_arp_unknown_operation() {
        let frame = decode_hex("00 1E 68 51 4F A9 00 1A 8C 10 AD 30 08 06 00 01 08 00 06 04 00 09 00 1A 8C 10 AD 30 AC 10 00 01 00 00 00 00 00 00 AC 10 FF 01");
        let record = record(&frame);

        assert_eq!(record.protocol, "ARP");
        assert_eq!(record.info, "UNKNOWN (9) from 172.16.0.1");
    }

    #[test]
    fn test_arp_wrong_address_sizes() {
        let frame = decode_hex("00 1E 68 51 4F A9 00 1A 8C 10 AD 30 08 06 00 01 08 00 08 04 00 01 00 1A 8C 10 AD 30 AC 10 00 01 00 00 00 00 00 00 AC 10 FF 01");
        let record = record(&frame);

        assert_eq!(record.protocol, "Ethernet");
        assert_eq!(record.layers.len(), 2);
    }
}
