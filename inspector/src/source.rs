use chrono::Utc;
use dpi::frame::{RawFrame, Timestamp};
use std::io::BufRead;
use thiserror::Error;

/// One frame read from a source, owning its bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedFrame {
    pub data: Vec<u8>,
    pub truncated: bool,
    pub timestamp: Timestamp,
}

impl OwnedFrame {
    pub fn raw(&self) -> RawFrame<'_> {
        RawFrame {
            data: &self.data,
            captured_length: self.data.len(),
            truncated: self.truncated,
        }
    }
}

pub trait FrameSource {
    /// `None` once the source is exhausted.
    fn next_frame(&mut self) -> Option<Result<OwnedFrame, SourceError>>;
}

/// Reads one hex-encoded frame per line.
///
/// Blank lines and lines starting with `#` are skipped, whitespace inside a line is ignored.
pub struct HexLineSource<R: BufRead> {
    reader: R,
    snapshot_length: usize,
    line_number: usize,
}

impl<R: BufRead> HexLineSource<R> {
    pub fn new(reader: R, snapshot_length: usize) -> Self {
        Self {
            reader,
            snapshot_length,
            line_number: 0,
        }
    }

    fn decode_line(&self, line: &str) -> Result<OwnedFrame, SourceError> {
        let digits: String = line.chars().filter(|c| !c.is_whitespace()).collect();
        let mut data = hex::decode(&digits).map_err(|err| SourceError::InvalidHex {
            line: self.line_number,
            err,
        })?;

        let truncated = data.len() > self.snapshot_length;
        if truncated {
            data.truncate(self.snapshot_length);
        }

        Ok(OwnedFrame {
            data,
            truncated,
            timestamp: now(),
        })
    }
}

impl<R: BufRead> FrameSource for HexLineSource<R> {
    fn next_frame(&mut self) -> Option<Result<OwnedFrame, SourceError>> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => self.line_number = self.line_number.saturating_add(1),
                Err(err) => return Some(Err(SourceError::IOError(err))),
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            return Some(self.decode_line(trimmed));
        }
    }
}

fn now() -> Timestamp {
    let time = Utc::now();
    Timestamp {
        tv_sec: time.timestamp(),
        tv_usec: i64::from(time.timestamp_subsec_micros()),
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("Line {line} is not a hex frame.")]
    InvalidHex { line: usize, err: hex::FromHexError },
}

impl SourceError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            SourceError::IOError(err) => Some(err.to_string()),
            SourceError::InvalidHex { err, .. } => Some(err.to_string()),
        }
    }
}
