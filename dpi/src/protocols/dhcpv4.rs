use crate::layer::{Address, Field, FieldValue, Layer};
use crate::parser::ParserError;
use crate::protocols::arp::hardware_type::HardwareType;
use crate::protocols::{ProtocolData, ProtocolId, ip};
use nom::bytes::take;
use nom::number::{be_u8, be_u16, be_u32};
use nom::{IResult, Parser};
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use std::fmt::Formatter;
use std::net::Ipv4Addr;
use strum_macros::Display;

// DHCPv4 Protocol
// RFC 2131: https://datatracker.ietf.org/doc/html/rfc2131
// Options, RFC 2132: https://datatracker.ietf.org/doc/html/rfc2132

pub const HEADER_LENGTH: usize = 240;
pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;
pub const LAYER_NAME: &str = "Dynamic Host Configuration Protocol";
pub const OPTIONS_LAYER_NAME: &str = "Options";

pub const BROADCAST_FLAG: u16 = 0x8000;
pub const HARDWARE_ADDRESS_WITH_PADDING_LENGTH_BYTES: usize = 16;
pub const SERVER_NAME_LENGTH_BYTES: usize = 64;
pub const FILE_NAME_LENGTH_BYTES: usize = 128;

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    // Operation, 1 byte.
    let (rest, op) = be_u8().parse(bytes)?;
    let operation = OperationType::try_from(op)
        .map_err(|_| ParserError::ErrorVerify.to_nom(bytes))?;

    // Hardware Type, 1 byte
    let (rest, htype) = be_u8().parse(rest)?;
    let hardware_type = HardwareType::from(u16::from(htype));

    // Hardware Address Length, 1 byte
    let (rest, hlen) = be_u8().parse(rest)?;
    if hlen as usize > HARDWARE_ADDRESS_WITH_PADDING_LENGTH_BYTES {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }

    // Hops, 1 byte
    let (rest, hops) = be_u8().parse(rest)?;

    // xId, 4 bytes
    let (rest, xid) = be_u32().parse(rest)?;

    // Secs, 2 bytes
    let (rest, secs) = be_u16().parse(rest)?;

    // Flags, 2 bytes. Only the leftmost bit is defined
    let (rest, flags) = be_u16().parse(rest)?;

    // Old Client IP, 4 bytes
    let (rest, ciaddr) = ip::address::v4_parse(rest)?;

    // New Client IP, 4 bytes
    let (rest, yiaddr) = ip::address::v4_parse(rest)?;

    // Server IP Address, 4 bytes
    let (rest, siaddr) = ip::address::v4_parse(rest)?;

    // Relay agent IP Address, 4 bytes
    let (rest, giaddr) = ip::address::v4_parse(rest)?;

    // Hardware address, 16 bytes, the first `hlen` are meaningful
    let (rest, chaddr) = take(HARDWARE_ADDRESS_WITH_PADDING_LENGTH_BYTES).parse(rest)?;
    let (_, chaddr) = take(hlen).parse(chaddr)?;

    // Optional server name string, 64 bytes
    let (rest, sname) = take(SERVER_NAME_LENGTH_BYTES).parse(rest)?;

    // File name, 128 bytes
    let (rest, file) = take(FILE_NAME_LENGTH_BYTES).parse(rest)?;

    // Magic cookie, 4 bytes. Reported as is
    let (rest, magic_cookie) = be_u32().parse(rest)?;

    // Options, variable length
    let (rest, options) = parse_options(rest)?;

    let protocol = DHCPv4 {
        operation,
        hardware_type,
        hardware_length: hlen,
        hops,
        x_id: xid,
        secs,
        flags,
        old_client_address: ciaddr,
        new_client_address: yiaddr,
        server_address: siaddr,
        relay_agent_address: giaddr,
        hardware_address_client: chaddr.to_vec(),
        server_name: null_terminated(sname),
        file_name: null_terminated(file),
        magic_cookie,
        options,
    };

    Ok((rest, ProtocolData::DHCPv4(protocol)))
}

// Every step reads through nom, so a length byte running past the end is an error, not an overread.
fn parse_options(input: &[u8]) -> IResult<&[u8], Vec<OptionData>> {
    let mut options: Vec<OptionData> = Vec::new();
    let mut rest_buffer = input;

    while !rest_buffer.is_empty() {
        let (rest, code) = be_u8().parse(rest_buffer)?;
        rest_buffer = rest;

        match OptionCode::from(code) {
            OptionCode::End => break,
            OptionCode::Pad => continue,
            _ => {},
        }

        let (rest, length) = be_u8().parse(rest_buffer)?;
        let (rest, content) = take(length).parse(rest)?;
        let (_, option) = OptionData::parse(OptionCode::from(code), content)?;

        options.push(option);
        rest_buffer = rest;
    }

    Ok((rest_buffer, options))
}

fn null_terminated(bytes: &[u8]) -> Option<String> {
    let end = bytes.iter().position(|byte| *byte == 0).unwrap_or(bytes.len());
    match end {
        0 => None,
        _ => Some(String::from_utf8_lossy(&bytes[..end]).to_string()),
    }
}

fn parse_addresses(input: &[u8]) -> IResult<&[u8], Vec<Ipv4Addr>> {
    if input.is_empty() || input.len() % ip::address::V4_LENGTH_BYTES != 0 {
        return Err(ParserError::ErrorVerify.to_nom(input));
    }

    let mut ips: Vec<Ipv4Addr> = vec![];
    let mut rest_buffer = input;
    while !rest_buffer.is_empty() {
        let (rest, address) = ip::address::v4_parse(rest_buffer)?;
        ips.push(address);
        rest_buffer = rest;
    }

    Ok((rest_buffer, ips))
}

pub fn check_ports(port_source: u16, port_destination: u16) -> bool {
    matches!(
        (port_source, port_destination),
        (SERVER_PORT, CLIENT_PORT) | (CLIENT_PORT, SERVER_PORT)
    )
}

#[derive(Clone, Debug, PartialEq)]
pub struct DHCPv4 {
    pub operation: OperationType,
    pub hardware_type: HardwareType,
    pub hardware_length: u8,
    pub hops: u8,
    pub x_id: u32,
    pub secs: u16,
    pub flags: u16,
    pub old_client_address: Ipv4Addr,
    pub new_client_address: Ipv4Addr,
    pub server_address: Ipv4Addr,
    pub relay_agent_address: Ipv4Addr,
    pub hardware_address_client: Vec<u8>,
    pub server_name: Option<String>,
    pub file_name: Option<String>,
    pub magic_cookie: u32,
    pub options: Vec<OptionData>,
}

impl DHCPv4 {
    /// Value of option 53, absent when the message carries no such option.
    pub fn message_type(&self) -> Option<MessageType> {
        self.options.iter().find_map(|option| match option {
            OptionData::MessageType(value) => Some(*value),
            _ => None,
        })
    }

    pub fn is_broadcast(&self) -> bool {
        self.flags & BROADCAST_FLAG != 0
    }

    pub fn client_address(&self) -> Address {
        Address::Hardware(self.hardware_address_client.clone())
    }

    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::DHCPv4.tag();
        let mut layer = Layer::new(LAYER_NAME);

        layer.push(Field::new("Operation", self.operation.to_string(), tag));
        layer.push(
            Field::new("Hardware Type", u16::from(self.hardware_type), tag)
                .describe(self.hardware_type.to_string()),
        );
        layer.push(Field::new("Hardware Length", self.hardware_length, tag));
        layer.push(Field::new("Hops", self.hops, tag));
        layer.push(Field::new(
            "Transaction ID",
            FieldValue::Hex(u64::from(self.x_id)),
            tag,
        ));
        layer.push(Field::new("Seconds", self.secs, tag));
        let flags_description = match self.is_broadcast() {
            true => "Broadcast",
            false => "Unicast",
        };
        layer.push(
            Field::new("Flags", FieldValue::Hex(u64::from(self.flags)), tag)
                .describe(flags_description),
        );
        layer.push(Field::new("Client IP", self.old_client_address, tag));
        layer.push(Field::new("Assigned IP", self.new_client_address, tag));
        layer.push(Field::new("Server IP", self.server_address, tag));
        layer.push(Field::new("Relay Agent IP", self.relay_agent_address, tag));
        layer.push(Field::new(
            "Client MAC",
            FieldValue::Address(self.client_address()),
            tag,
        ));
        if let Some(server_name) = &self.server_name {
            layer.push(Field::new("Server Name", server_name.as_str(), tag));
        }
        if let Some(file_name) = &self.file_name {
            layer.push(Field::new("Boot File", file_name.as_str(), tag));
        }
        layer.push(Field::new(
            "Magic Cookie",
            FieldValue::Hex(u64::from(self.magic_cookie)),
            tag,
        ));
        if let Some(message_type) = self.message_type() {
            layer.push(Field::new("Message Type", message_type.to_string(), tag));
        }

        if !self.options.is_empty() {
            let mut options = Layer::new(OPTIONS_LAYER_NAME);
            for option in &self.options {
                let code = option.code();
                options.push(
                    Field::new(&code.to_string(), option.to_string(), tag)
                        .describe(format!("Option {}", u8::from(code))),
                );
            }
            layer.nest(options);
        }

        layer
    }

    pub fn summary(&self) -> String {
        let kind = match self.message_type() {
            Some(message_type) => message_type.to_string(),
            None => self.operation.to_string(),
        };

        format!("{} from {}", kind, self.client_address())
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, FromPrimitive, IntoPrimitive, PartialEq)]
#[repr(u8)]
pub enum OptionCode {
    Pad = 0,
    End = 255,
    #[strum(to_string = "Subnet Mask")]
    SubnetMask = 1,
    Router = 3,
    #[strum(to_string = "Domain Name Server")]
    DomainNameServer = 6,
    #[strum(to_string = "Host Name")]
    HostName = 12,
    #[strum(to_string = "Domain Name")]
    DomainName = 15,
    #[strum(to_string = "Requested IP Address")]
    RequestedIpAddress = 50,
    #[strum(to_string = "Lease Time")]
    LeaseTime = 51,
    #[strum(to_string = "Message Type")]
    MessageType = 53,
    #[strum(to_string = "Server Identifier")]
    ServerIdentifier = 54,

    #[num_enum(catch_all)]
    Unknown(u8),
}

#[derive(Clone, Debug, PartialEq)]
pub enum OptionData {
    SubnetMask(Ipv4Addr),
    Router(Vec<Ipv4Addr>),
    DomainNameServer(Vec<Ipv4Addr>),
    HostName(String),
    DomainName(String),
    RequestedIpAddress(Ipv4Addr),
    LeaseTime(u32),
    MessageType(MessageType),
    ServerIdentifier(Ipv4Addr),
    Other { code: u8, data: Vec<u8> },
}

impl OptionData {
    pub fn parse(code: OptionCode, content: &[u8]) -> IResult<&[u8], Self> {
        let data = match code {
            OptionCode::SubnetMask => {
                let (_, mask) = ip::address::v4_parse(content)?;
                Self::SubnetMask(mask)
            },
            OptionCode::Router => {
                let (_, ips) = parse_addresses(content)?;
                Self::Router(ips)
            },
            OptionCode::DomainNameServer => {
                let (_, ips) = parse_addresses(content)?;
                Self::DomainNameServer(ips)
            },
            OptionCode::HostName => {
                Self::HostName(String::from_utf8_lossy(content).trim_matches('\0').to_string())
            },
            OptionCode::DomainName => Self::DomainName(
                String::from_utf8_lossy(content).trim_matches('\0').to_string(),
            ),
            OptionCode::RequestedIpAddress => {
                let (_, ip) = ip::address::v4_parse(content)?;
                Self::RequestedIpAddress(ip)
            },
            OptionCode::LeaseTime => {
                let (_, seconds) = be_u32().parse(content)?;
                Self::LeaseTime(seconds)
            },
            OptionCode::MessageType => {
                let (_, message_type) = be_u8().parse(content)?;
                Self::MessageType(MessageType::from(message_type))
            },
            OptionCode::ServerIdentifier => {
                let (_, ip) = ip::address::v4_parse(content)?;
                Self::ServerIdentifier(ip)
            },
            OptionCode::Pad | OptionCode::End | OptionCode::Unknown(_) => Self::Other {
                code: u8::from(code),
                data: content.to_vec(),
            },
        };

        Ok((&[], data))
    }

    pub fn code(&self) -> OptionCode {
        match self {
            Self::SubnetMask(_) => OptionCode::SubnetMask,
            Self::Router(_) => OptionCode::Router,
            Self::DomainNameServer(_) => OptionCode::DomainNameServer,
            Self::HostName(_) => OptionCode::HostName,
            Self::DomainName(_) => OptionCode::DomainName,
            Self::RequestedIpAddress(_) => OptionCode::RequestedIpAddress,
            Self::LeaseTime(_) => OptionCode::LeaseTime,
            Self::MessageType(_) => OptionCode::MessageType,
            Self::ServerIdentifier(_) => OptionCode::ServerIdentifier,
            Self::Other { code, .. } => OptionCode::from(*code),
        }
    }
}

impl std::fmt::Display for OptionData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let join = |ips: &[Ipv4Addr]| {
            ips.iter()
                .map(|ip| ip.to_string())
                .collect::<Vec<String>>()
                .join(", ")
        };

        match self {
            Self::SubnetMask(ip) | Self::RequestedIpAddress(ip) | Self::ServerIdentifier(ip) => {
                write!(f, "{}", ip)
            },
            Self::Router(ips) | Self::DomainNameServer(ips) => write!(f, "{}", join(ips)),
            Self::HostName(name) | Self::DomainName(name) => write!(f, "{}", name),
            Self::LeaseTime(seconds) => write!(f, "{}s", seconds),
            Self::MessageType(message_type) => write!(f, "{}", message_type),
            Self::Other { data, .. } => write!(f, "0x{}", hex::encode(data)),
        }
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum OperationType {
    #[strum(to_string = "REQUEST")]
    BootRequest = 1,
    #[strum(to_string = "REPLY")]
    BootReply = 2,
}

#[derive(Clone, Copy, Debug, Display, Eq, FromPrimitive, PartialEq)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,

    #[num_enum(catch_all)]
    Unknown(u8),
}
