use crate::protocols::ethernet::mac::MacAddress;
use serde::{Serialize, Serializer};
use std::fmt::Formatter;
use std::net::Ipv4Addr;

/// One node of the dissection tree.
///
/// Fields and children keep the order they were pushed in, which is the order
/// the bytes were decoded in. Entries of a protocol section (DNS answers, RIP
/// routes, HTTP headers) are fields of a child layer, never deeper layers.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Layer {
    pub name: String,
    pub fields: Vec<Field>,
    pub children: Vec<Layer>,
}

impl Layer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: vec![],
            children: vec![],
        }
    }

    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    pub fn nest(&mut self, child: Layer) {
        self.children.push(child);
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Layer> {
        self.children.iter().find(|child| child.name == name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: &str, value: impl Into<FieldValue>, protocol: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            protocol: protocol.to_string(),
            description: None,
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Rendered scalar of a field.
///
/// `Integer` serializes as a JSON number, every other variant as its display string.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(u64),
    Hex(u64),
    Address(Address),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Address {
    Mac(MacAddress),
    Ipv4(Ipv4Addr),
    Hardware(Vec<u8>),
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Address::Mac(mac) => write!(f, "{}", mac),
            Address::Ipv4(ip) => write!(f, "{}", ip),
            Address::Hardware(bytes) => {
                let octets: Vec<String> =
                    bytes.iter().map(|byte| format!("{:02X}", byte)).collect();
                write!(f, "{}", octets.join(":"))
            },
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Text(text) => write!(f, "{}", text),
            FieldValue::Integer(number) => write!(f, "{}", number),
            FieldValue::Hex(number) => write!(f, "0x{:x}", number),
            FieldValue::Address(address) => write!(f, "{}", address),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Integer(number) => serializer.serialize_u64(*number),
            _ => serializer.collect_str(self),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        Self::Integer(u64::from(value))
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        Self::Integer(u64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(u64::from(value))
    }
}

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        Self::Integer(value as u64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Ipv4Addr> for FieldValue {
    fn from(value: Ipv4Addr) -> Self {
        Self::Address(Address::Ipv4(value))
    }
}

impl From<MacAddress> for FieldValue {
    fn from(value: MacAddress) -> Self {
        Self::Address(Address::Mac(value))
    }
}
