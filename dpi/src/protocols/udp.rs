use crate::layer::{Field, FieldValue, Layer};
use crate::parser::ParserError;
use crate::protocols::{ProtocolData, ProtocolId};
use nom::IResult;
use nom::Parser;
use nom::number::be_u16;

// UDP Protocol
// RFC 768: https://datatracker.ietf.org/doc/html/rfc768

pub const HEADER_LENGTH: usize = 8;
pub const LAYER_NAME: &str = "User Datagram Protocol";

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    // Source port. 2 bytes
    let (rest, port_source) = be_u16().parse(bytes)?;
    // Destination port. 2 bytes
    let (rest, port_destination) = be_u16().parse(rest)?;
    // Length. 2 bytes
    let (rest, length) = be_u16().parse(rest)?;
    // Checksum. 2 bytes
    let (rest, checksum) = be_u16().parse(rest)?;

    // Length covers the header too
    let payload_length = (length as usize)
        .checked_sub(HEADER_LENGTH)
        .ok_or(ParserError::ErrorVerify.to_nom(bytes))?;
    // A truncated capture keeps whatever was captured
    let payload = rest.get(..payload_length).unwrap_or(rest);

    let protocol = UDP {
        port_source,
        port_destination,
        length,
        checksum,
        payload_length: payload.len(),
    };

    Ok((payload, ProtocolData::UDP(protocol)))
}

pub fn best_children(udp: &UDP) -> Option<ProtocolId> {
    ProtocolId::UDP
        .children()?
        .into_iter()
        .find(|children| match children.check_ports() {
            Some(port_validate) => port_validate(udp.port_source, udp.port_destination),
            None => false,
        })
}

#[derive(Clone, Debug, PartialEq)]
pub struct UDP {
    pub port_source: u16,
    pub port_destination: u16,
    pub length: u16,
    pub checksum: u16,
    pub payload_length: usize,
}

impl UDP {
    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::UDP.tag();
        let mut layer = Layer::new(LAYER_NAME);

        layer.push(Field::new("Source Port", self.port_source, tag));
        layer.push(Field::new("Destination Port", self.port_destination, tag));
        layer.push(Field::new("Length", self.length, tag));
        layer.push(Field::new(
            "Checksum",
            FieldValue::Hex(u64::from(self.checksum)),
            tag,
        ));

        layer
    }

    pub fn summary(&self) -> String {
        format!(
            "{} → {} Len={}",
            self.port_source, self.port_destination, self.payload_length
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::{decode_hex, layers, record};

    #[test]
    fn test_udp_without_ethernet_padding() {
        let frame = decode_hex("01 00 5E 00 00 FC 40 61 86 9A F1 F5 08 00 45 00 00 32 6A 3D 00 00 01 11 AA 56 C0 A8 03 83 E0 00 00 FC D5 48 14 EB 00 1E 20 88 76 F2 00 00 00 01 00 00 00 00 00 00 04 77 70 61 64 00 00 01 00 01");
        let layers = layers(&frame);

        let actual_udp = match layers[2].clone() {
            ProtocolData::UDP(value) => value,
            _ => panic!(),
        };

        let expected_udp = UDP {
            port_source: 54600,
            port_destination: 5355,
            length: 30,
            checksum: 0x2088,
            payload_length: 22,
        };

        assert_eq!(actual_udp, expected_udp);
        assert_eq!(layers.len(), 3);
    }

    #[test]
    fn test_udp_with_ethernet_padding() {
        let frame = decode_hex("00 1E 68 51 4F A9 00 1A 8C 10 AD 30 08 00 45 00 00 2D 41 23 00 00 71 11 F7 55 58 C6 0D 6F AC 10 FF 01 53 78 C7 27 00 19 BB 26 B4 DC 02 B9 57 01 B1 11 45 7F BB A7 6C 79 6D 64 7E 00");
        let record = record(&frame);

        assert_eq!(record.protocol, "UDP");
        assert_eq!(record.info, "21368 → 50983 Len=17");
        assert_eq!(record.source, "88.198.13.111:21368");
        assert_eq!(record.target, "172.16.255.1:50983");

        let layer = &record.layers[3];
        assert_eq!(layer.name, "User Datagram Protocol");
        let names: Vec<&str> = layer.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Source Port", "Destination Port", "Length", "Checksum"]
        );
        assert_eq!(layer.field("Checksum").unwrap().value.to_string(), "0xbb26");
    }

    #[test]
    fn test_udp_dispatch_priority() {
        let udp = |port_source, port_destination| UDP {
            port_source,
            port_destination,
            length: 8,
            checksum: 0,
            payload_length: 0,
        };

        assert_eq!(best_children(&udp(58643, 53)), Some(ProtocolId::DNS));
        assert_eq!(best_children(&udp(68, 67)), Some(ProtocolId::DHCPv4));
        assert_eq!(best_children(&udp(67, 68)), Some(ProtocolId::DHCPv4));
        assert_eq!(best_children(&udp(67, 1067)), None);
        assert_eq!(best_children(&udp(520, 520)), Some(ProtocolId::RIP));
        // DNS wins over RIP
        assert_eq!(best_children(&udp(53, 520)), Some(ProtocolId::DNS));
        assert_eq!(best_children(&udp(54600, 5355)), None);
    }

    #[test]
    fn test_udp_garbage_on_dns_port() {
        let frame = decode_hex("00 1E 68 51 4F A9 00 1A 8C 10 AD 30 08 00 45 00 00 21 41 23 00 00 71 11 F7 55 58 C6 0D 6F AC 10 FF 01 E5 13 00 35 00 0D 00 00 DE AD BE EF 00");
        let record = record(&frame);

        assert_eq!(record.protocol, "UDP");
        assert_eq!(record.info, "58643 → 53 Len=5");
        assert_eq!(record.layers.len(), 4);
    }

    #[test]
    fn test_udp_invalid_length() {
        let bytes = decode_hex("E5 13 00 35 00 04 00 00");
        assert!(ProtocolId::UDP.decode(&bytes).is_err());
    }
}
