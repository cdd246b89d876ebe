use crate::layer::{Field, FieldValue, Layer};
use crate::protocols::ip::address;
use crate::protocols::{ProtocolData, ProtocolId};
use nom::IResult;
use nom::Parser;
use nom::number::{be_u8, be_u16};
use num_enum::{FromPrimitive, IntoPrimitive};
use std::net::Ipv4Addr;
use strum_macros::Display;

// ICMPv4 Protocol
// RFC 792: https://datatracker.ietf.org/doc/html/rfc792

pub const HEADER_LENGTH: usize = 8;
pub const LAYER_NAME: &str = "Internet Control Message Protocol";

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    // Message type. 1 byte
    let (rest, message_type) = be_u8().parse(bytes)?;
    let message_type = MessageType::from(message_type);

    // Code. 1 byte
    let (rest, code) = be_u8().parse(rest)?;

    // Checksum. 2 bytes
    let (rest, checksum) = be_u16().parse(rest)?;

    // Rest of header. 4 bytes, depending on type
    let (rest, body) = match message_type {
        MessageType::EchoReply | MessageType::EchoRequest => {
            let (rest, identifier) = be_u16().parse(rest)?;
            let (rest, sequence) = be_u16().parse(rest)?;
            (
                rest,
                Body::Echo {
                    identifier,
                    sequence,
                },
            )
        },
        MessageType::DestinationUnreachable => {
            let (rest, gateway) = address::v4_parse(rest)?;
            (rest, Body::DestinationUnreachable { gateway })
        },
        _ => (rest, Body::Other),
    };

    let protocol = ICMPv4 {
        message_type,
        code,
        checksum,
        body,
    };

    Ok((rest, ProtocolData::ICMPv4(protocol)))
}

#[derive(Clone, Debug, PartialEq)]
pub struct ICMPv4 {
    pub message_type: MessageType,
    pub code: u8,
    pub checksum: u16,
    pub body: Body,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Echo { identifier: u16, sequence: u16 },
    DestinationUnreachable { gateway: Ipv4Addr },
    Other,
}

impl ICMPv4 {
    pub fn identifier(&self) -> Option<u16> {
        match self.body {
            Body::Echo { identifier, .. } => Some(identifier),
            _ => None,
        }
    }

    pub fn sequence(&self) -> Option<u16> {
        match self.body {
            Body::Echo { sequence, .. } => Some(sequence),
            _ => None,
        }
    }

    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::ICMPv4.tag();
        let mut layer = Layer::new(LAYER_NAME);

        layer.push(
            Field::new("Type", u8::from(self.message_type), tag)
                .describe(self.message_type.to_string()),
        );
        layer.push(Field::new("Code", self.code, tag));
        layer.push(Field::new(
            "Checksum",
            FieldValue::Hex(u64::from(self.checksum)),
            tag,
        ));

        match &self.body {
            Body::Echo {
                identifier,
                sequence,
            } => {
                layer.push(Field::new("Identifier", *identifier, tag));
                layer.push(Field::new("Sequence Number", *sequence, tag));
            },
            Body::DestinationUnreachable { gateway } => {
                layer.push(Field::new("Gateway Address", *gateway, tag));
            },
            Body::Other => {},
        }

        layer
    }

    pub fn summary(&self) -> String {
        format!(
            "ICMP Type {} Code {}",
            u8::from(self.message_type),
            self.code
        )
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, FromPrimitive, IntoPrimitive, PartialEq)]
#[repr(u8)]
pub enum MessageType {
    #[strum(to_string = "Echo Reply")]
    EchoReply = 0,
    #[strum(to_string = "Destination Unreachable")]
    DestinationUnreachable = 3,
    #[strum(to_string = "Source Quench")]
    SourceQuench = 4,
    Redirect = 5,
    #[strum(to_string = "Echo Request")]
    EchoRequest = 8,
    #[strum(to_string = "Router Advertisement")]
    RouterAdvertisement = 9,
    #[strum(to_string = "Router Solicitation")]
    RouterSolicitation = 10,
    #[strum(to_string = "Time Exceeded")]
    TimeExceeded = 11,
    #[strum(to_string = "Parameter Problem")]
    ParameterProblem = 12,
    Timestamp = 13,
    #[strum(to_string = "Timestamp Reply")]
    TimestampReply = 14,

    #[num_enum(catch_all)]
    Unknown(u8),
}
