use crate::frame::{CaptureContext, PacketRecord, RawFrame, Timestamp};
use crate::protocols::{ProtocolData, ProtocolId};
use nom::IResult;
use thiserror::Error;

#[derive(Debug, Default)]
pub struct ProtocolParser {
    captured: u64,
}

impl ProtocolParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records produced so far. It is also the index of the last record.
    pub fn captured(&self) -> u64 {
        self.captured
    }

    pub fn process(&mut self, frame: &RawFrame, timestamp: Timestamp) -> Option<PacketRecord> {
        let index = self.captured.checked_add(1)?;
        let context = CaptureContext { index, timestamp };

        let record = dissect(frame, &context)?;
        self.captured = index;

        Some(record)
    }
}

/// Dissects one frame.
///
/// Returns `None` only when the Ethernet header itself can't be decoded.
/// Any deeper failure stops the descent and the record describes the layers decoded before it.
pub fn dissect(frame: &RawFrame, context: &CaptureContext) -> Option<PacketRecord> {
    let bytes = frame.bytes();
    let mut layers: Vec<ProtocolData> = Vec::new();

    match traversal(&ProtocolId::Ethernet, bytes, &mut layers, 0) {
        ProcessResult::Failed => None,
        ProcessResult::Complete | ProcessResult::Incomplete => {
            Some(PacketRecord::assemble(frame, context, &layers))
        },
    }
}

fn traversal(
    id: &ProtocolId, bytes: &[u8], layers: &mut Vec<ProtocolData>, depth: usize,
) -> ProcessResult {
    const MAX_DEPTH: usize = 16;
    if depth > MAX_DEPTH {
        return ProcessResult::Failed;
    }

    match id.decode(bytes) {
        Ok((rest, layer)) => {
            let best = layer.best_children(rest);
            layers.push(layer);

            let best = match best {
                Some(value) => value,
                None => return ProcessResult::Complete,
            };

            let result = match depth.checked_add(1) {
                Some(new_depth) => traversal(&best, rest, layers, new_depth),
                None => ProcessResult::Failed,
            };

            match result {
                ProcessResult::Complete => ProcessResult::Complete,
                ProcessResult::Incomplete | ProcessResult::Failed => {
                    ProcessResult::Incomplete
                },
            }
        },
        Err(error) => {
            log::debug!("{}", error);
            ProcessResult::Failed
        },
    }
}

pub fn cast_to_bool(bit: u8) -> Result<bool, ParserError> {
    match bit {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(ParserError::ErrorVerify),
    }
}

pub type ParseFn = fn(&[u8]) -> IResult<&[u8], ProtocolData>;
pub type PortFn = fn(u16, u16) -> bool;

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("{protocol}: buffer too short, needed {needed} bytes, available {available}")]
    BufferTooShort {
        protocol: ProtocolId,
        needed: usize,
        available: usize,
    },

    #[error("{protocol}: bytes don't match the protocol format")]
    FormatMismatch { protocol: ProtocolId },
}

impl DecodeError {
    pub fn from_nom(
        protocol: ProtocolId, available: usize, error: nom::Err<nom::error::Error<&[u8]>>,
    ) -> Self {
        match error {
            nom::Err::Incomplete(needed) => {
                let missing = match needed {
                    nom::Needed::Size(size) => size.get(),
                    nom::Needed::Unknown => 1,
                };
                Self::BufferTooShort {
                    protocol,
                    needed: available.saturating_add(missing),
                    available,
                }
            },
            nom::Err::Error(inner) | nom::Err::Failure(inner) => match inner.code {
                nom::error::ErrorKind::Eof => Self::BufferTooShort {
                    protocol,
                    needed: available.saturating_add(1),
                    available,
                },
                _ => Self::FormatMismatch { protocol },
            },
        }
    }
}

pub enum ParserError {
    ErrorVerify,
    Incomplete,
}

impl ParserError {
    pub fn to_nom<T>(&self, input: T) -> nom::Err<nom::error::Error<T>> {
        match self {
            Self::ErrorVerify => nom::Err::Error(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Verify,
            )),
            Self::Incomplete => nom::Err::Incomplete(nom::Needed::Unknown),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProcessResult {
    // Fully parsed
    Complete,

    // Some protocols parsed, but the deepest candidate failed
    Incomplete,

    // Not matched
    Failed,
}
