use crate::layer::{Field, FieldValue, Layer};
use crate::parser::{ParserError, cast_to_bool};
use crate::protocols::{ProtocolData, ProtocolId, http};
use nom::number::{be_u16, be_u32};
use nom::{IResult, Parser, bits};
use std::fmt::Formatter;

// TCP Protocol
// RFC 9293: https://datatracker.ietf.org/doc/html/rfc9293

pub const HEADER_MIN_LENGTH: usize = 20;
pub const LAYER_NAME: &str = "Transmission Control Protocol";

pub const DATA_OFFSET_LENGTH_BITS: usize = 4;
pub const RESERVED_LENGTH_BITS: usize = 4;
pub const FLAG_LENGTH_BITS: usize = 1;
type TcpFlags = (u8, u8, u8, u8, u8, u8, u8, u8);

pub fn parse(bytes: &[u8]) -> IResult<&[u8], ProtocolData> {
    // Source port. 2 bytes
    let (rest, port_source) = be_u16().parse(bytes)?;
    // Destination port. 2 bytes
    let (rest, port_destination) = be_u16().parse(rest)?;

    // Sequence number, 4 bytes
    let (rest, sequence_number) = be_u32().parse(rest)?;
    // Acknowledgement number, 4 bytes
    let (rest, acknowledgement_number) = be_u32().parse(rest)?;

    // Data Offset, Reserved. Both - 4 bits
    let (rest, (data_offset, reserved)): (&[u8], (u16, u8)) =
        bits::bits::<_, _, nom::error::Error<_>, _, _>((
            bits::complete::take(DATA_OFFSET_LENGTH_BITS),
            bits::complete::take(RESERVED_LENGTH_BITS),
        ))(rest)?;
    // Data Offset is stored in 32bit words.
    let data_offset = data_offset
        .checked_mul(4)
        .ok_or(ParserError::ErrorVerify.to_nom(bytes))?;
    if (data_offset as usize) < HEADER_MIN_LENGTH {
        return Err(ParserError::ErrorVerify.to_nom(bytes));
    }

    // Flags: 8 flags by 1 bit.
    let (rest, flags): (&[u8], TcpFlags) =
        bits::bits::<_, _, nom::error::Error<_>, _, _>((
            bits::complete::take(FLAG_LENGTH_BITS),
            bits::complete::take(FLAG_LENGTH_BITS),
            bits::complete::take(FLAG_LENGTH_BITS),
            bits::complete::take(FLAG_LENGTH_BITS),
            bits::complete::take(FLAG_LENGTH_BITS),
            bits::complete::take(FLAG_LENGTH_BITS),
            bits::complete::take(FLAG_LENGTH_BITS),
            bits::complete::take(FLAG_LENGTH_BITS),
        ))(rest)?;
    let flags =
        Flags::try_from(flags).map_err(|_| ParserError::ErrorVerify.to_nom(bytes))?;

    // Window: 2 bytes.
    let (rest, window) = be_u16().parse(rest)?;
    // Checksum: 2 bytes.
    let (rest, checksum) = be_u16().parse(rest)?;
    // Urgent pointer: 2 bytes.
    let (_, urgent_pointer) = be_u16().parse(rest)?;

    // Options are skipped by the data offset.
    let payload = bytes
        .get(data_offset as usize..)
        .ok_or(ParserError::Incomplete.to_nom(bytes))?;

    let protocol = TCP {
        port_source,
        port_destination,
        sequence_number,
        acknowledgement_number,
        data_offset,
        reserved,
        flags,
        window,
        checksum,
        urgent_pointer,
    };

    Ok((payload, ProtocolData::TCP(protocol)))
}

pub fn best_children(payload: &[u8]) -> Option<ProtocolId> {
    match http::sniff(payload) {
        true => Some(ProtocolId::HTTP),
        false => None,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TCP {
    pub port_source: u16,
    pub port_destination: u16,
    pub sequence_number: u32,
    pub acknowledgement_number: u32,
    pub data_offset: u16,
    pub reserved: u8,
    pub flags: Flags,
    pub window: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
}

impl TCP {
    pub fn to_layer(&self) -> Layer {
        let tag = ProtocolId::TCP.tag();
        let mut layer = Layer::new(LAYER_NAME);

        layer.push(Field::new("Source Port", self.port_source, tag));
        layer.push(Field::new("Destination Port", self.port_destination, tag));
        layer.push(Field::new("Sequence Number", self.sequence_number, tag));
        layer.push(Field::new(
            "Acknowledgment Number",
            self.acknowledgement_number,
            tag,
        ));
        layer.push(Field::new("Header Length", self.data_offset, tag).describe("bytes"));
        layer.push(
            Field::new("Flags", FieldValue::Hex(u64::from(u8::from(&self.flags))), tag)
                .describe(self.flags.to_string()),
        );
        layer.push(Field::new("Window", self.window, tag));
        layer.push(Field::new(
            "Checksum",
            FieldValue::Hex(u64::from(self.checksum)),
            tag,
        ));
        layer.push(Field::new("Urgent Pointer", self.urgent_pointer, tag));

        layer
    }

    pub fn summary(&self) -> String {
        format!(
            "{} → {} [{}] Seq={} Ack={} Win={}",
            self.port_source,
            self.port_destination,
            self.flags,
            self.sequence_number,
            self.acknowledgement_number,
            self.window
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Flags {
    pub congestion_window_reduced: bool,
    pub ecn_echo: bool,
    pub urgent: bool,
    pub acknowledgment: bool,
    pub push: bool,
    pub reset: bool,
    pub syn: bool,
    pub fin: bool,
}

impl TryFrom<TcpFlags> for Flags {
    type Error = ParserError;

    fn try_from(value: TcpFlags) -> Result<Self, Self::Error> {
        Ok(Self {
            congestion_window_reduced: cast_to_bool(value.0)?,
            ecn_echo: cast_to_bool(value.1)?,
            urgent: cast_to_bool(value.2)?,
            acknowledgment: cast_to_bool(value.3)?,
            push: cast_to_bool(value.4)?,
            reset: cast_to_bool(value.5)?,
            syn: cast_to_bool(value.6)?,
            fin: cast_to_bool(value.7)?,
        })
    }
}

impl From<&Flags> for u8 {
    fn from(flags: &Flags) -> Self {
        [
            flags.congestion_window_reduced,
            flags.ecn_echo,
            flags.urgent,
            flags.acknowledgment,
            flags.push,
            flags.reset,
            flags.syn,
            flags.fin,
        ]
        .iter()
        .fold(0, |byte, flag| byte << 1 | u8::from(*flag))
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names = [
            (self.fin, "FIN"),
            (self.syn, "SYN"),
            (self.reset, "RST"),
            (self.push, "PSH"),
            (self.acknowledgment, "ACK"),
            (self.urgent, "URG"),
            (self.ecn_echo, "ECE"),
            (self.congestion_window_reduced, "CWR"),
        ];
        let set: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| *flag)
            .map(|(_, name)| *name)
            .collect();

        write!(f, "{}", set.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::{decode_hex, layers, record};

    #[test]
    fn test_tcp_with_options() {
        let frame = decode_hex("40 61 86 9A F1 F5 00 1A 8C 15 F9 80 08 00 45 00 00 34 94 15 00 00 34 06 11 0F 48 0E D5 66 C0 A8 03 83 00 50 DA 8E B2 61 2D 93 5D 1A BE A5 80 12 16 58 A0 94 00 00 02 04 05 96 01 01 04 02 01 03 03 06");
        let layers = layers(&frame);

        let actual_tcp = match layers[2].clone() {
            ProtocolData::TCP(value) => value,
            _ => panic!(),
        };

        let expected_tcp = TCP {
            port_source: 80,
            port_destination: 55950,
            sequence_number: 2992713107,
            acknowledgement_number: 0x5d1abea5,
            data_offset: 32,
            reserved: 0,
            flags: Flags {
                congestion_window_reduced: false,
                ecn_echo: false,
                urgent: false,
                acknowledgment: true,
                push: false,
                reset: false,
                syn: true,
                fin: false,
            },
            window: 5720,
            checksum: 0xa094,
            urgent_pointer: 0,
        };

        assert_eq!(actual_tcp, expected_tcp);
        assert_eq!(u8::from(&actual_tcp.flags), 0x12);
        assert_eq!(actual_tcp.flags.to_string(), "SYN, ACK");
    }

    #[test]
    fn test_tcp_without_options() {
        let frame = decode_hex("40 61 86 9A F1 F5 00 1A 8C 15 F9 80 08 00 45 00 00 56 2B 9A 00 00 34 06 79 3B 48 0E D5 93 C0 A8 03 83 01 BB CB B8 EE BA 28 1D 18 D9 BD 5F 50 18 00 D5 37 24 00 00 DE A9 06 7D DE 13 B6 78 A0 EA 50 53 29 A3 75 9C 1B B3 B0 3B 4D E5 21 DD 11 D4 75 A8 79 D5 58 B6 9F 6D 32 EA 72 F8 B0 54 C3 2F E9 AF 98 E4");
        let record = record(&frame);

        // Encrypted payload doesn't look like HTTP
        assert_eq!(record.protocol, "TCP");
        assert_eq!(record.layers.len(), 4);
        assert_eq!(record.source, "72.14.213.147:443");
        assert_eq!(record.target, "192.168.3.131:52152");
        assert_eq!(
            record.info,
            "443 → 52152 [PSH, ACK] Seq=4005177373 Ack=416922975 Win=213"
        );

        let layer = &record.layers[3];
        assert_eq!(layer.name, "Transmission Control Protocol");
        assert_eq!(layer.field("Header Length").unwrap().value.to_string(), "20");
        assert_eq!(layer.field("Flags").unwrap().value.to_string(), "0x18");
    }

    #[test]
    fn test_tcp_invalid_data_offset() {
        let bytes = decode_hex("00 50 DA 8E B2 61 2D 93 5D 1A BE A5 40 12 16 58 A0 94 00 00");
        assert_eq!(
            ProtocolId::TCP.decode(&bytes),
            Err(crate::parser::DecodeError::FormatMismatch {
                protocol: ProtocolId::TCP
            })
        );
    }

    #[test]
    fn test_tcp_options_beyond_capture() {
        let bytes = decode_hex("00 50 DA 8E B2 61 2D 93 5D 1A BE A5 80 12 16 58 A0 94 00 00 02 04");
        assert!(matches!(
            ProtocolId::TCP.decode(&bytes),
            Err(crate::parser::DecodeError::BufferTooShort { .. })
        ));
    }
}
