use crate::layer::{Field, Layer};
use crate::parser::ParserError;
use crate::protocols::ip::address;
use crate::protocols::{ProtocolData, ProtocolId};
use nom::IResult;
use nom::Parser;
use nom::number::{be_u8, be_u16, be_u32};
use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt::Formatter;
use std::net::Ipv4Addr;

// RIP Version 2
// RFC 2453: https://datatracker.ietf.org/doc/html/rfc2453

pub const HEADER_LENGTH: usize = 4;
pub const ENTRY_LENGTH: usize = 20;
pub const PORT_RIP: u16 = 520;
pub const SUPPORTED_VERSION: u8 = 2;
pub const LAYER_NAME: &str = "Routing Information Protocol";
pub const ENTRIES_LAYER_NAME: &str = "RIP Entries";

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    // Command. 1 byte
    let (rest, command) = be_u8().parse(bytes)?;
    let command = Command::from(command);

    // Version. 1 byte. RIPv1 has no mask and next hop, so it's not decoded
    let (rest, version) = be_u8().parse(rest)?;
    if version != SUPPORTED_VERSION {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }

    // Must be zero. 2 bytes
    let (mut rest, zero) = be_u16().parse(rest)?;

    // Route entries. 20 bytes each, a trailing remainder is ignored
    let mut entries: Vec<RouteEntry> = Vec::new();
    while rest.len() >= ENTRY_LENGTH {
        let (entry_rest, entry) = parse_entry(rest)?;
        entries.push(entry);
        rest = entry_rest;
    }

    let protocol = RIP {
        command,
        version,
        zero,
        entries,
    };

    Ok((rest, ProtocolData::RIP(protocol)))
}

fn parse_entry(bytes: &[u8]) -> IResult<&[u8], RouteEntry> {
    // Address Family Identifier. 2 bytes
    let (rest, address_family) = be_u16().parse(bytes)?;
    // Route Tag. 2 bytes
    let (rest, route_tag) = be_u16().parse(rest)?;
    // IP Address. 4 bytes
    let (rest, address) = address::v4_parse(rest)?;
    // Subnet Mask. 4 bytes
    let (rest, subnet_mask) = address::v4_parse(rest)?;
    // Next Hop. 4 bytes
    let (rest, next_hop) = address::v4_parse(rest)?;
    // Metric. 4 bytes
    let (rest, metric) = be_u32().parse(rest)?;

    let entry = RouteEntry {
        address_family,
        route_tag,
        address,
        subnet_mask,
        next_hop,
        metric,
    };

    Ok((rest, entry))
}

pub fn check_ports(port_source: u16, port_destination: u16) -> bool {
    port_source == PORT_RIP || port_destination == PORT_RIP
}

#[derive(Clone, Debug, PartialEq)]
pub struct RIP {
    pub command: Command,
    pub version: u8,
    pub zero: u16,
    pub entries: Vec<RouteEntry>,
}

impl RIP {
    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::RIP.tag();
        let mut layer = Layer::new(LAYER_NAME);

        layer.push(Field::new("Command", self.command.to_string(), tag));
        layer.push(Field::new("Version", self.version, tag));
        layer.push(Field::new("Zero", self.zero, tag));

        if !self.entries.is_empty() {
            let mut entries = Layer::new(ENTRIES_LAYER_NAME);
            for (number, entry) in (1..).zip(&self.entries) {
                entries.push(Field::new(
                    &format!("Entry {}", number),
                    entry.to_string(),
                    tag,
                ));
            }
            layer.nest(entries);
        }

        layer
    }

    pub fn summary(&self) -> String {
        format!(
            "{} (Version {}) with {} entries",
            self.command,
            self.version,
            self.entries.len()
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteEntry {
    pub address_family: u16,
    pub route_tag: u16,
    pub address: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    pub metric: u32,
}

impl std::fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AFI: {}, Route Tag: {}, IP: {}, Subnet Mask: {}, Next Hop: {}, Metric: {}",
            self.address_family,
            self.route_tag,
            self.address,
            self.subnet_mask,
            self.next_hop,
            self.metric
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, IntoPrimitive, PartialEq)]
#[repr(u8)]
pub enum Command {
    Request = 1,
    Response = 2,

    #[num_enum(catch_all)]
    Unknown(u8),
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Request => write!(f, "Request"),
            Self::Response => write!(f, "Response"),
            Self::Unknown(code) => write!(f, "Unknown ({})", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::{decode_hex, layers, record};

    const RESPONSE_FRAME: &str = "01 00 5E 00 00 09 00 1A 8C 10 AD 30 08 00 45 C0 00 48 00 00 00 00 02 11 00 00 C0 A8 01 01 E0 00 00 09 02 08 02 08 00 34 00 00 02 02 00 00 00 02 00 00 0A 00 00 00 FF 00 00 00 00 00 00 00 00 00 00 01 00 02 00 00 C0 A8 02 00 FF FF FF 00 C0 A8 01 FE 00 00 00 02";

    #[test]
    fn test_rip_response_entries() {
        let frame = decode_hex(RESPONSE_FRAME);
        let layers = layers(&frame);

        let actual_rip = match layers[3].clone() {
            ProtocolData::RIP(value) => value,
            _ => panic!(),
        };

        let expected_rip = RIP {
            command: Command::Response,
            version: 2,
            zero: 0,
            entries: vec![
                RouteEntry {
                    address_family: 2,
                    route_tag: 0,
                    address: Ipv4Addr::new(10, 0, 0, 0),
                    subnet_mask: Ipv4Addr::new(255, 0, 0, 0),
                    next_hop: Ipv4Addr::new(0, 0, 0, 0),
                    metric: 1,
                },
                RouteEntry {
                    address_family: 2,
                    route_tag: 0,
                    address: Ipv4Addr::new(192, 168, 2, 0),
                    subnet_mask: Ipv4Addr::new(255, 255, 255, 0),
                    next_hop: Ipv4Addr::new(192, 168, 1, 254),
                    metric: 2,
                },
            ],
        };

        assert_eq!(actual_rip, expected_rip);
    }

    #[test]
    fn test_rip_record() {
        let frame = decode_hex(RESPONSE_FRAME);
        let record = record(&frame);

        assert_eq!(record.protocol, "RIP");
        assert_eq!(record.info, "Response (Version 2) with 2 entries");
        assert_eq!(record.source, "192.168.1.1:520");
        assert_eq!(record.target, "224.0.0.9:520");

        let layer = record.layers.last().unwrap();
        assert_eq!(layer.name, "Routing Information Protocol");
        assert_eq!(layer.field("Command").unwrap().value.to_string(), "Response");

        let entries = layer.child("RIP Entries").unwrap();
        assert_eq!(entries.fields.len(), 2);
        assert_eq!(entries.fields[1].name, "Entry 2");
        assert_eq!(
            entries.fields[1].value.to_string(),
            "AFI: 2, Route Tag: 0, IP: 192.168.2.0, Subnet Mask: 255.255.255.0, Next Hop: 192.168.1.254, Metric: 2"
        );
    }

    #[test]
    fn test_rip_partial_entry_is_ignored() {
        let bytes = decode_hex("01 02 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 00 10 00 02 00 00");
        let (rest, data) = ProtocolId::RIP.decode(&bytes).unwrap();

        let rip = match data {
            ProtocolData::RIP(value) => value,
            _ => panic!(),
        };
        assert_eq!(rip.command, Command::Request);
        assert_eq!(rip.entries.len(), 1);
        assert_eq!(rip.entries[0].metric, 16);
        assert_eq!(rest.len(), 4);
        assert!(rip.to_layer().child(ENTRIES_LAYER_NAME).is_some());
    }

    #[test]
    fn test_rip_unknown_command_without_entries() {
        let bytes = decode_hex("07 02 00 00");
        let (_, data) = ProtocolId::RIP.decode(&bytes).unwrap();

        assert_eq!(data.summary(), "Unknown (7) (Version 2) with 0 entries");
        assert!(data.to_layer().children.is_empty());
    }

    #[test]
    fn test_ripv1_falls_back_to_udp() {
        let frame = decode_hex("FF FF FF FF FF FF 00 1A 8C 10 AD 30 08 00 45 00 00 34 00 00 00 00 01 11 00 00 C0 A8 01 01 FF FF FF FF 02 08 02 08 00 20 00 00 02 01 00 00 00 02 00 00 0A 00 00 00 00 00 00 00 00 00 00 00 00 00 00 01");
        let record = record(&frame);

        assert_eq!(record.protocol, "UDP");
        assert_eq!(record.layers.len(), 4);
    }
}
