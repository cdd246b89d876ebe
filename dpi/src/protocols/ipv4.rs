use crate::layer::{Field, FieldValue, Layer};
use crate::parser::ParserError;
use crate::protocols::ip::protocol::IpNextLevelProtocol;
use crate::protocols::ip::address;
use crate::protocols::{ProtocolData, ProtocolId};
use nom::number::{be_u8, be_u16};
use nom::{IResult, Parser, bits};
use std::net::Ipv4Addr;

// IPv4 Protocol
// RFC 791: https://datatracker.ietf.org/doc/html/rfc791

pub const HEADER_MIN_LENGTH: usize = 20;
pub const LAYER_NAME: &str = "Internet Protocol";

pub const VERSION_LENGTH_BITS: usize = 4;
pub const IHL_LENGTH_BITS: usize = 4;
pub const DSCP_LENGTH_BITS: usize = 6;
pub const ECN_LENGTH_BITS: usize = 2;
pub const FLAGS_LENGTH_BITS: usize = 3;
pub const FRAGMENT_OFFSET_LENGTH_BITS: usize = 13;

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    // Version, IHL. Both - 4 bits
    let (rest, (version, internet_header_length)): (&[u8], (u8, u8)) =
        bits::bits::<_, _, nom::error::Error<_>, _, _>((
            bits::complete::take(VERSION_LENGTH_BITS),
            bits::complete::take(IHL_LENGTH_BITS),
        ))(bytes)?;
    if version != 4 {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }
    // IHL is stored in 32bit words
    let internet_header_length = internet_header_length
        .checked_mul(4)
        .ok_or(ParserError::ErrorVerify.to_nom(bytes))?;
    if (internet_header_length as usize) < HEADER_MIN_LENGTH {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }
    if internet_header_length as usize > bytes.len() {
        return Err(ParserError::Incomplete.to_nom(bytes));
    }

    // DSCP - 6 bits, ECN - 2 bits
    let (rest, (differentiated_services_code_point, explicit_congestion_notification)): (
        &[u8],
        (u8, u8),
    ) = bits::bits::<_, _, nom::error::Error<_>, _, _>((
        bits::complete::take(DSCP_LENGTH_BITS),
        bits::complete::take(ECN_LENGTH_BITS),
    ))(rest)?;

    // Total length. 2 bytes
    let (rest, total_length) = be_u16().parse(rest)?;
    // Identification. 2 bytes
    let (rest, identification) = be_u16().parse(rest)?;

    // Flags - 3 bits, Fragment offset - 13 bits
    let (rest, (flags, fragment_offset)): (&[u8], (u8, u16)) =
        bits::bits::<_, _, nom::error::Error<_>, _, _>((
            bits::complete::take(FLAGS_LENGTH_BITS),
            bits::complete::take(FRAGMENT_OFFSET_LENGTH_BITS),
        ))(rest)?;

    // Time to live. 1 byte
    let (rest, time_to_live) = be_u8().parse(rest)?;
    // Protocol. 1 byte
    let (rest, protocol_inner) = be_u8().parse(rest)?;
    let protocol_inner = IpNextLevelProtocol::from(protocol_inner);
    // Header checksum. 2 bytes
    let (rest, checksum) = be_u16().parse(rest)?;

    // Addresses. 4 bytes each
    let (rest, address_source) = address::v4_parse(rest)?;
    let (_, address_destination) = address::v4_parse(rest)?;

    // Options are skipped.
    let header_length = internet_header_length as usize;
    let payload = bytes
        .get(header_length..)
        .ok_or(ParserError::Incomplete.to_nom(bytes))?;

    // Ethernet padding is cut by the total length.
    // Zero total length is left by segmentation offload, the captured payload is kept then.
    let payload = match (total_length as usize).checked_sub(header_length) {
        Some(length) if total_length != 0 => payload.get(..length).unwrap_or(payload),
        Some(_) => payload,
        None => return Err(ParserError::ErrorVerify.to_nom(bytes)),
    };

    let protocol = IPv4 {
        version,
        internet_header_length,
        differentiated_services_code_point,
        explicit_congestion_notification,
        total_length,
        identification,
        flags,
        fragment_offset,
        time_to_live,
        protocol_inner,
        checksum,
        address_source,
        address_destination,
    };

    Ok((payload, ProtocolData::IPv4(protocol)))
}

pub fn best_children(ipv4: &IPv4) -> Option<ProtocolId> {
    // Only the first fragment starts with a transport header
    if ipv4.fragment_offset != 0 {
        return None;
    }

    match ipv4.protocol_inner {
        IpNextLevelProtocol::TCP => Some(ProtocolId::TCP),
        IpNextLevelProtocol::UDP => Some(ProtocolId::UDP),
        IpNextLevelProtocol::ICMPv4 => Some(ProtocolId::ICMPv4),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IPv4 {
    pub version: u8,
    pub internet_header_length: u8,
    pub differentiated_services_code_point: u8,
    pub explicit_congestion_notification: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags: u8,
    pub fragment_offset: u16,
    pub time_to_live: u8,
    pub protocol_inner: IpNextLevelProtocol,
    pub checksum: u16,
    pub address_source: Ipv4Addr,
    pub address_destination: Ipv4Addr,
}

impl IPv4 {
    pub fn dont_fragment(&self) -> bool {
        self.flags & 0b010 != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.flags & 0b001 != 0
    }

    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::IPv4.tag();
        let mut layer = Layer::new(LAYER_NAME);

        layer.push(Field::new("Version", self.version, tag));
        layer.push(
            Field::new("Header Length", self.internet_header_length, tag).describe("bytes"),
        );
        layer.push(
            Field::new(
                "Differentiated Services",
                FieldValue::Hex(u64::from(
                    self.differentiated_services_code_point << 2
                        | self.explicit_congestion_notification,
                )),
                tag,
            )
            .describe(format!(
                "DSCP: {}, ECN: {}",
                self.differentiated_services_code_point, self.explicit_congestion_notification
            )),
        );
        layer.push(Field::new("Total Length", self.total_length, tag));
        layer.push(Field::new(
            "Identification",
            FieldValue::Hex(u64::from(self.identification)),
            tag,
        ));

        let mut flags = Vec::new();
        if self.dont_fragment() {
            flags.push("Don't Fragment");
        }
        if self.more_fragments() {
            flags.push("More Fragments");
        }
        let flags_field = Field::new("Flags", FieldValue::Hex(u64::from(self.flags)), tag);
        match flags.is_empty() {
            true => layer.push(flags_field),
            false => layer.push(flags_field.describe(flags.join(", "))),
        }

        layer.push(Field::new("Fragment Offset", self.fragment_offset, tag));
        layer.push(Field::new("Time to Live", self.time_to_live, tag));
        layer.push(
            Field::new("Protocol", u8::from(self.protocol_inner), tag)
                .describe(self.protocol_inner.to_string()),
        );
        layer.push(Field::new(
            "Header Checksum",
            FieldValue::Hex(u64::from(self.checksum)),
            tag,
        ));
        layer.push(Field::new("Source IP", self.address_source, tag));
        layer.push(Field::new("Destination IP", self.address_destination, tag));

        layer
    }

    pub fn summary(&self) -> String {
        let summary = format!(
            "IPv4 protocol {} ({})",
            u8::from(self.protocol_inner),
            self.protocol_inner
        );

        match self.fragment_offset {
            0 => summary,
            offset => format!("{}, fragment offset {}", summary, offset),
        }
    }
}
