use crate::layer::{Field, Layer};
use crate::protocols::ProtocolData;
use serde::Serialize;
use std::fmt::Formatter;
use std::net::Ipv4Addr;

pub const FRAME_LAYER: &str = "Frame";

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Timestamp {
    pub tv_sec: i64,
    pub tv_usec: i64,
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:06}", self.tv_sec, self.tv_usec)
    }
}

/// Bytes of one captured frame as handed over by the capture source.
///
/// The buffer may be longer than `captured_length`, bytes past it are never read.
#[derive(Clone, Debug)]
pub struct RawFrame<'a> {
    pub data: &'a [u8],
    pub captured_length: usize,
    pub truncated: bool,
}

impl<'a> RawFrame<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            captured_length: data.len(),
            truncated: false,
        }
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.data.get(..self.captured_length).unwrap_or(self.data)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CaptureContext {
    pub index: u64,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PacketRecord {
    pub index: u64,
    #[serde(rename = "time")]
    pub timestamp: Timestamp,
    pub source: String,
    pub target: String,
    pub protocol: String,
    pub length: usize,
    pub info: String,
    pub layers: Vec<Layer>,
}

impl PacketRecord {
    pub fn assemble(
        frame: &RawFrame, context: &CaptureContext, decoded: &[ProtocolData],
    ) -> Self {
        let length = frame.bytes().len();

        let mut frame_layer = Layer::new(FRAME_LAYER);
        frame_layer.push(Field::new("Length", length, "frame"));
        frame_layer.push(Field::new("Truncated", frame.truncated, "frame"));
        frame_layer.push(Field::new(
            "Arrival Time",
            context.timestamp.to_string(),
            "frame",
        ));

        let mut layers = Vec::with_capacity(decoded.len().saturating_add(1));
        layers.push(frame_layer);
        layers.extend(decoded.iter().map(ProtocolData::to_layer));

        let (protocol, info) = match decoded.last() {
            Some(deepest) => (deepest.label(), deepest.summary()),
            None => (FRAME_LAYER.to_string(), String::new()),
        };
        let (source, target) = endpoints(decoded);

        Self {
            index: context.index,
            timestamp: context.timestamp,
            source,
            target,
            protocol,
            length,
            info,
            layers,
        }
    }
}

// MAC for link-only frames, IP for network frames, "ip:port" once a transport is known.
fn endpoints(decoded: &[ProtocolData]) -> (String, String) {
    let mut endpoints = (String::new(), String::new());
    let mut hosts: Option<(Ipv4Addr, Ipv4Addr)> = None;

    for layer in decoded {
        match layer {
            ProtocolData::Ethernet(ethernet) => {
                endpoints = (
                    ethernet.source_mac.to_string(),
                    ethernet.destination_mac.to_string(),
                );
            },
            ProtocolData::Arp(arp) => {
                endpoints = (arp.sender_ip.to_string(), arp.target_ip.to_string());
            },
            ProtocolData::IPv4(ip) => {
                hosts = Some((ip.address_source, ip.address_destination));
                endpoints = (
                    ip.address_source.to_string(),
                    ip.address_destination.to_string(),
                );
            },
            ProtocolData::TCP(tcp) => {
                if let Some((source, destination)) = hosts {
                    endpoints = (
                        format!("{}:{}", source, tcp.port_source),
                        format!("{}:{}", destination, tcp.port_destination),
                    );
                }
            },
            ProtocolData::UDP(udp) => {
                if let Some((source, destination)) = hosts {
                    endpoints = (
                        format!("{}:{}", source, udp.port_source),
                        format!("{}:{}", destination, udp.port_destination),
                    );
                }
            },
            _ => {},
        }
    }

    endpoints
}
