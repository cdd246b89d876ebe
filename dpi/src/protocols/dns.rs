use crate::layer::{Field, FieldValue, Layer};
use crate::parser;
use crate::parser::ParserError;
use crate::protocols::{ProtocolData, ProtocolId};
use nom::IResult;
use nom::bytes::take;
use nom::number::{be_u8, be_u16, be_u32};
use nom::{Parser, bits};
use num_enum::{FromPrimitive, TryFromPrimitive};
use std::fmt::Formatter;
use std::net::{Ipv4Addr, Ipv6Addr};
use strum_macros::Display;

// DNS Protocol
// RFC 1035: https://datatracker.ietf.org/doc/html/rfc1035

pub const HEADER_LENGTH: usize = 12;
pub const PORT_DNS: u16 = 53;
pub const LAYER_NAME: &str = "Domain Name System";

pub const MESSAGE_TYPE_LENGTH_BITS: usize = 1;
pub const OPERATION_CODE_LENGTH_BITS: usize = 4;
pub const AUTHORITATIVE_ANSWER_LENGTH_BITS: usize = 1;
pub const TRUNCATION_FLAG_LENGTH_BITS: usize = 1;
pub const RECURSION_DESIRED_LENGTH_BITS: usize = 1;
pub const RECURSION_AVAILABLE_LENGTH_BITS: usize = 1;
pub const RESERVED_LENGTH_BITS: usize = 3;
pub const RESPONSE_CODE_LENGTH_BITS: usize = 4;

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    // HEADER
    // Identifier - 16 bits.
    let (rest, id) = be_u16().parse(bytes)?;

    // Message Type (QR), Operation Code (OPCODE)
    // Authoritative Answer (AA), Truncation (TC), Recursion Desired (RD)
    // Recursion Available (RA), Reserved (Z, AD, CD), Response Code (RCODE)
    type DnsHeaderBits = (u8, u8, u8, u8, u8, u8, u8, u8);
    let (rest, (qr, opcode, aa, tc, rd, ra, _, rcode)): (&[u8], DnsHeaderBits) =
        bits::bits::<_, _, nom::error::Error<_>, _, _>((
            bits::complete::take(MESSAGE_TYPE_LENGTH_BITS),
            bits::complete::take(OPERATION_CODE_LENGTH_BITS),
            bits::complete::take(AUTHORITATIVE_ANSWER_LENGTH_BITS),
            bits::complete::take(TRUNCATION_FLAG_LENGTH_BITS),
            bits::complete::take(RECURSION_DESIRED_LENGTH_BITS),
            bits::complete::take(RECURSION_AVAILABLE_LENGTH_BITS),
            bits::complete::take(RESERVED_LENGTH_BITS),
            bits::complete::take(RESPONSE_CODE_LENGTH_BITS),
        ))(rest)?;
    let message_type =
        MessageType::try_from(qr).map_err(|_| ParserError::ErrorVerify.to_nom(bytes))?;
    let operation_code = OperationCode::try_from(opcode)
        .map_err(|_| ParserError::ErrorVerify.to_nom(bytes))?;
    let authoritative_answer =
        parser::cast_to_bool(aa).map_err(|err| err.to_nom(bytes))?;
    let truncation = parser::cast_to_bool(tc).map_err(|err| err.to_nom(bytes))?;
    let recursion_desired = parser::cast_to_bool(rd).map_err(|err| err.to_nom(bytes))?;
    let recursion_available =
        parser::cast_to_bool(ra).map_err(|err| err.to_nom(bytes))?;
    let response_code = ResponseCode::try_from(rcode)
        .map_err(|_| ParserError::ErrorVerify.to_nom(bytes))?;

    // QDCOUNT - 16 bits
    let (rest, question_entries) = be_u16().parse(rest)?;
    // ANCOUNT - 16 bits,
    let (rest, answer_records) = be_u16().parse(rest)?;
    // NSCOUNT - 16 bits,
    let (rest, authority_records) = be_u16().parse(rest)?;
    // ARCOUNT - 16 bits
    let (mut rest, additional_records) = be_u16().parse(rest)?;

    let header = Header {
        id,
        message_type,
        operation_code,
        authoritative_answer,
        truncation,
        recursion_desired,
        recursion_available,
        response_code,

        question_entries,
        answer_records,
        authority_records,
        additional_records,
    };

    // QUESTION SECTION
    let mut question_section: Vec<QuestionEntry> = vec![];
    for _ in 0..question_entries {
        let (section_rest, question) = parse_question_section(rest, bytes)?;
        question_section.push(question);
        rest = section_rest;
    }

    // ANSWER SECTION
    let (rest, answer_section) = parse_record_section(rest, answer_records, bytes)?;

    // AUTHORITY SECTION
    let (rest, authority_section) = parse_record_section(rest, authority_records, bytes)?;

    // ADDITIONAL SECTION
    let (rest, additional_section) =
        parse_record_section(rest, additional_records, bytes)?;

    let protocol = DNS {
        header,
        question_section,
        answer_section,
        authority_section,
        additional_section,
    };

    Ok((rest, ProtocolData::DNS(protocol)))
}

pub fn check_ports(port_source: u16, port_destination: u16) -> bool {
    port_source == PORT_DNS || port_destination == PORT_DNS
}

fn parse_question_section<'a>(
    bytes: &'a [u8], whole: &'a [u8],
) -> IResult<&'a [u8], QuestionEntry> {
    // QNAME
    let (rest, qname) = parse_name(bytes, whole, 1)?;

    // QTYPE
    let (rest, qtype) = be_u16().parse(rest)?;

    // QCLASS
    let (rest, qclass) = be_u16().parse(rest)?;

    let section = QuestionEntry {
        name: qname,
        entry_type: DnsType::from(qtype),
        class: Class::from_wire(qclass),
    };

    Ok((rest, section))
}

fn parse_name<'a>(
    bytes: &'a [u8], whole: &'a [u8], depth: u8,
) -> IResult<&'a [u8], String> {
    const MAX_DEPTH_LEVEL_RECURSION_NAME_PARSING: u8 = 7;
    if depth > MAX_DEPTH_LEVEL_RECURSION_NAME_PARSING {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }

    let mut labels: Vec<String> = Vec::new();

    let mut main_rest = bytes;
    loop {
        let (rest, length_octet) = be_u8().parse(main_rest)?;
        if length_octet == 0 {
            main_rest = rest;
            break;
        }

        let is_simple_parsing = (length_octet & 0b1100_0000) != 0b1100_0000;

        match is_simple_parsing {
            true => {
                let (rest, word) = take(length_octet).parse(rest)?;
                let word = String::from_utf8(word.to_vec())
                    .map_err(|_| ParserError::ErrorVerify.to_nom(bytes))?;
                labels.push(word);
                main_rest = rest;
            },

            false => {
                let (rest, next_byte) = be_u8().parse(rest)?;

                let low6 = (length_octet & 0b0011_1111) as u16;
                let combined = (low6 << 8) | (next_byte as u16);
                let pointed_slice = whole
                    .get(usize::from(combined)..)
                    .ok_or(ParserError::ErrorVerify.to_nom(bytes))?;
                let (_, str) = parse_name(
                    pointed_slice,
                    whole,
                    depth
                        .checked_add(1)
                        .ok_or(ParserError::ErrorVerify.to_nom(bytes))?,
                )?;
                labels.push(str);
                main_rest = rest;
                break;
            },
        }
    }
    let name = labels.join(".");

    Ok((main_rest, name))
}

fn parse_record_section<'a>(
    bytes: &'a [u8], records: u16, whole: &'a [u8],
) -> IResult<&'a [u8], Vec<ResourceRecord>> {
    let mut rest = bytes;
    let mut section: Vec<ResourceRecord> = vec![];
    for _ in 0..records {
        let (section_rest, record) = parse_resource_record(rest, whole)?;
        section.push(record);
        rest = section_rest;
    }

    Ok((rest, section))
}

fn parse_resource_record<'a>(
    bytes: &'a [u8], whole: &'a [u8],
) -> IResult<&'a [u8], ResourceRecord> {
    // NAME
    let (rest, name) = parse_name(bytes, whole, 1)?;

    // TYPE
    let (rest, record_type) = be_u16().parse(rest)?;
    let record_type = DnsType::from(record_type);

    // CLASS
    let (rest, class) = be_u16().parse(rest)?;
    let class = Class::from_wire(class);

    // TTL
    let (rest, time_to_live) = be_u32().parse(rest)?;

    // RDLength
    let (rest, data_length) = be_u16().parse(rest)?;

    // RDATA
    let (rest, data) = take(data_length).parse(rest)?;
    let (_, data) = DnsTypeData::try_from_bytes(data, whole, &record_type)?;

    let record = ResourceRecord {
        name,
        record_type,
        class,
        time_to_live,
        data_length,
        data,
    };

    Ok((rest, record))
}

#[derive(Clone, Debug, PartialEq)]
pub struct DNS {
    pub header: Header,
    pub question_section: Vec<QuestionEntry>,
    pub answer_section: Vec<ResourceRecord>,
    pub authority_section: Vec<ResourceRecord>,
    pub additional_section: Vec<ResourceRecord>,
}

impl DNS {
    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::DNS.tag();
        let header = &self.header;
        let mut layer = Layer::new(LAYER_NAME);

        layer.push(Field::new(
            "Transaction ID",
            FieldValue::Hex(u64::from(header.id)),
            tag,
        ));
        layer.push(Field::new("Type", header.message_type.to_string(), tag));
        layer.push(Field::new("Opcode", header.operation_code.to_string(), tag));
        layer.push(Field::new("Authoritative", header.authoritative_answer, tag));
        layer.push(Field::new("Truncated", header.truncation, tag));
        layer.push(Field::new("Recursion Desired", header.recursion_desired, tag));
        layer.push(Field::new(
            "Recursion Available",
            header.recursion_available,
            tag,
        ));
        layer.push(Field::new("Response Code", header.response_code.to_string(), tag));
        layer.push(Field::new("Questions", header.question_entries, tag));
        layer.push(Field::new("Answer RRs", header.answer_records, tag));
        layer.push(Field::new("Authority RRs", header.authority_records, tag));
        layer.push(Field::new("Additional RRs", header.additional_records, tag));

        if !self.question_section.is_empty() {
            let mut questions = Layer::new("Questions");
            for (number, question) in (1..).zip(&self.question_section) {
                questions.push(Field::new(
                    &format!("Question {}", number),
                    format!("{} ({})", display_name(&question.name), question.entry_type),
                    tag,
                ));
            }
            layer.nest(questions);
        }

        let sections = [
            ("Answers", "Answer", &self.answer_section),
            ("Authority", "Authority", &self.authority_section),
            ("Additional", "Additional", &self.additional_section),
        ];
        for (title, entry, records) in sections {
            if records.is_empty() {
                continue;
            }

            let mut child = Layer::new(title);
            for (number, record) in (1..).zip(records) {
                child.push(
                    Field::new(
                        &format!("{} {}", entry, number),
                        format!(
                            "{} ({}): {}",
                            display_name(&record.name),
                            record.record_type,
                            record.data
                        ),
                        tag,
                    )
                    .describe(format!("TTL: {}s", record.time_to_live)),
                );
            }
            layer.nest(child);
        }

        layer
    }

    pub fn summary(&self) -> String {
        let names: Vec<&str> = self
            .question_section
            .iter()
            .map(|question| display_name(&question.name))
            .collect();

        match names.is_empty() {
            true => self.header.message_type.to_string(),
            false => format!("{} {}", self.header.message_type, names.join(", ")),
        }
    }
}

fn display_name(name: &str) -> &str {
    match name.is_empty() {
        true => "<Root>",
        false => name,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Header {
    pub id: u16,
    pub message_type: MessageType,
    pub operation_code: OperationCode,
    pub authoritative_answer: bool,
    pub truncation: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub response_code: ResponseCode,

    pub question_entries: u16,
    pub answer_records: u16,
    pub authority_records: u16,
    pub additional_records: u16,
}

#[derive(Clone, Debug, PartialEq)]
pub struct QuestionEntry {
    pub name: String,
    pub entry_type: DnsType,
    pub class: Class,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResourceRecord {
    pub name: String,
    pub record_type: DnsType,
    pub class: Class,
    pub time_to_live: u32,
    pub data_length: u16,
    pub data: DnsTypeData,
}

#[derive(Clone, Debug, Display, PartialEq, TryFromPrimitive)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum MessageType {
    Query = 0,
    Response = 1,
}

#[derive(Clone, Debug, Display, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum OperationCode {
    #[strum(to_string = "Standard Query")]
    StandardQuery = 0,
    #[strum(to_string = "Inverse Query")]
    InverseQuery = 1,
    #[strum(to_string = "Server Status Request")]
    ServerStatusRequest = 2,
    Notify = 4,
    Update = 5,

    #[num_enum(alternatives = [3, 6..15])]
    Reserved = 15,
}

#[derive(Clone, Debug, Display, PartialEq, TryFromPrimitive)]
#[repr(u8)]
pub enum ResponseCode {
    #[strum(to_string = "No Error")]
    NoErrorCondition = 0,
    #[strum(to_string = "Format Error")]
    FormatError = 1,
    #[strum(to_string = "Server Failure")]
    ServerFailure = 2,
    #[strum(to_string = "Name Error")]
    NameError = 3,
    #[strum(to_string = "Not Implemented")]
    NotImplemented = 4,
    Refused = 5,

    #[num_enum(alternatives = [6..15])]
    Reserved = 15,
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[repr(u16)]
pub enum DnsType {
    A = 1,           // A host address
    NS = 2,          // An authoritative name server
    MD = 3,          // A mail destination (Obsolete - use MX)
    MF = 4,          // A mail forwarder (Obsolete - use MX)
    CNAME = 5,       // The canonical name for an alias
    SOA = 6,         // Marks the start of a zone of authority
    MB = 7,          // A mailbox domain name (EXPERIMENTAL)
    MG = 8,          // A mail group member (EXPERIMENTAL)
    MR = 9,          // A mail rename domain name (EXPERIMENTAL)
    NULL = 10,       // A null RR (EXPERIMENTAL)
    WKS = 11,        // A well known service description
    PTR = 12,        // A domain name pointer
    HINFO = 13,      // Host information
    MINFO = 14,      // Mailbox or mail list information
    MX = 15,         // Mail exchange
    TXT = 16,        // Text strings
    RP = 17,         // Responsible Person
    AFSDB = 18,      // AFS database record
    SIG = 24,        // Signature
    KEY = 25,        // Key record
    AAAA = 28,       // IPv6 address record
    LOC = 29,        // Location record
    SRV = 33,        // Service locator
    NAPTR = 35,      // Naming Authority Pointer
    KX = 36,         // Key Exchanger record
    CERT = 37,       // Certificate record
    DNAME = 39,      // Delegation name record
    OPT = 41,        // EDNS(0) pseudo-record
    APL = 42,        // Address Prefix List
    DS = 43,         // Delegation signer
    SSHFP = 44,      // SSH Public Key Fingerprint
    IPSECKEY = 45,   // IPsec Key
    RRSIG = 46,      // DNSSEC signature
    NSEC = 47,       // Next Secure record
    DNSKEY = 48,     // DNS Key record
    DHCID = 49,      // DHCP identifier
    NSEC3 = 50,      // Next Secure record version 3
    NSEC3PARAM = 51, // NSEC3 parameters
    TLSA = 52,       // TLSA certificate association
    SMIMEA = 53,     // S/MIME cert association
    HIP = 55,        // Host Identity Protocol
    CDS = 59,        // Child DS
    CDNSKEY = 60,    // Child DNSKEY
    OPENPGPKEY = 61, // OpenPGP public key record
    CSYNC = 62,      // Child-to-Parent Synchronization
    ZONEMD = 63,     // Message Digests for DNS Zones
    SVCB = 64,       // Service Binding
    HTTPS = 65,      // HTTPS Binding

    EUI48 = 108, // MAC address (EUI-48)
    EUI64 = 109, // MAC address (EUI-64)

    TKEY = 249,  // Transaction Key record
    TSIG = 250,  // Transaction Signature
    AXFR = 252,  // A request for a transfer of an entire zone
    MAILB = 253, // A request for mailbox-related records (MB, MG or MR)
    MAILA = 254, // A request for mail agent RRs (Obsolete - see MX)
    ALL = 255,   // A request for all records
    URI = 256,   // Uniform Resource Identifier
    CAA = 257,   // Certification Authority Authorization

    TA = 32768,  // DNSSEC Trust Authorities
    DLV = 32769, // DNSSEC Lookaside Validation record

    #[num_enum(catch_all)]
    Unknown(u16),
}

impl std::fmt::Display for DnsType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "TYPE{}", code),
            Self::ALL => write!(f, "ANY"),
            known => write!(f, "{:?}", known),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[repr(u16)]
pub enum Class {
    IN = 1, // The Internet
    CS = 2, // The CSNET class (Obsolete - used only for examples in some obsolete RFCs)
    CH = 3, // The CHAOS class
    HS = 4, // Hesiod [Dyer 87]

    ALL = 255,

    #[num_enum(catch_all)]
    Unknown(u16),
}

impl Class {
    // The top bit is the mDNS unicast-response / cache-flush flag
    pub fn from_wire(value: u16) -> Self {
        Self::from(value & 0x7FFF)
    }
}

impl std::fmt::Display for Class {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "CLASS{}", code),
            known => write!(f, "{:?}", known),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DnsTypeData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    CNAME(String),
    NS(String),
    PTR(String),
    MX {
        preference: u16,
        exchange: String,
    },
    TXT(Vec<String>),
    SOA {
        primary_name_server: String,
        mailbox: String,
        serial: u32,
        refresh_interval: u32,
        retry_interval: u32,
        expire_limit: u32,
        minimum_ttl: u32,
    },
    Unknown(Vec<u8>),
}

impl std::fmt::Display for DnsTypeData {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let text = match self {
            DnsTypeData::A(address) => address.to_string(),
            DnsTypeData::AAAA(address) => address.to_string(),
            DnsTypeData::CNAME(value) => value.to_string(),
            DnsTypeData::NS(value) => value.to_string(),
            DnsTypeData::PTR(value) => value.to_string(),
            DnsTypeData::MX {
                preference,
                exchange,
            } => format!("{} {}", preference, exchange),
            DnsTypeData::TXT(strings) => strings
                .iter()
                .map(|string| format!("\"{}\"", string))
                .collect::<Vec<String>>()
                .join(" "),
            DnsTypeData::SOA {
                primary_name_server,
                mailbox,
                ..
            } => format!("{} <{}>", primary_name_server, mailbox),
            DnsTypeData::Unknown(data) => format!("0x{}", hex::encode(data)),
        };

        write!(f, "{}", text)
    }
}

impl DnsTypeData {
    pub fn try_from_bytes<'a>(
        input: &'a [u8], whole: &'a [u8], dns_type: &DnsType,
    ) -> IResult<&'a [u8], Self> {
        match dns_type {
            DnsType::A => {
                let address = <[u8; 4]>::try_from(input)
                    .map_err(|_| ParserError::ErrorVerify.to_nom(input))?;
                Ok((&[], Self::A(Ipv4Addr::from(address))))
            },
            DnsType::AAAA => {
                let address = <[u8; 16]>::try_from(input)
                    .map_err(|_| ParserError::ErrorVerify.to_nom(input))?;
                Ok((&[], Self::AAAA(Ipv6Addr::from(address))))
            },
            DnsType::CNAME => {
                let (rest, cname) = parse_name(input, whole, 1)?;
                Ok((rest, Self::CNAME(cname)))
            },
            DnsType::NS => {
                let (rest, name) = parse_name(input, whole, 1)?;
                Ok((rest, Self::NS(name)))
            },
            DnsType::PTR => {
                let (rest, name) = parse_name(input, whole, 1)?;
                Ok((rest, Self::PTR(name)))
            },
            DnsType::MX => {
                let (rest, preference) = be_u16().parse(input)?;
                let (rest, exchange) = parse_name(rest, whole, 1)?;
                Ok((
                    rest,
                    Self::MX {
                        preference,
                        exchange,
                    },
                ))
            },
            DnsType::TXT => {
                let mut strings = Vec::new();
                let mut buffer = input;
                while !buffer.is_empty() {
                    let (rest, length) = be_u8().parse(buffer)?;
                    let (rest, text) = take(length).parse(rest)?;
                    strings.push(String::from_utf8_lossy(text).to_string());
                    buffer = rest;
                }
                Ok((buffer, Self::TXT(strings)))
            },
            DnsType::SOA => {
                let (rest, primary_name_server) = parse_name(input, whole, 1)?;
                let (rest, mailbox) = parse_name(rest, whole, 1)?;
                let (rest, serial) = be_u32().parse(rest)?;
                let (rest, refresh_interval) = be_u32().parse(rest)?;
                let (rest, retry_interval) = be_u32().parse(rest)?;
                let (rest, expire_limit) = be_u32().parse(rest)?;
                let (rest, minimum_ttl) = be_u32().parse(rest)?;

                Ok((
                    rest,
                    Self::SOA {
                        primary_name_server,
                        mailbox,
                        serial,
                        refresh_interval,
                        retry_interval,
                        expire_limit,
                        minimum_ttl,
                    },
                ))
            },
            _ => Ok((&[], Self::Unknown(input.to_vec()))),
        }
    }
}
