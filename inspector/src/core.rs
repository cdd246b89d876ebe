use crate::config::Config;
use crate::source::{FrameSource, SourceError};
use dpi::ProtocolParser;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Default, PartialEq)]
pub struct Statistics {
    pub read: u64,
    pub dissected: u64,
    pub dropped: u64,
    pub rejected: u64,
}

pub fn start<S: FrameSource, W: Write>(
    source: &mut S, out: &mut W, config: &Config,
) -> Result<Statistics, CoreError> {
    let mut parser = ProtocolParser::new();
    let mut statistics = Statistics::default();

    while let Some(frame) = source.next_frame() {
        let frame = match frame {
            Ok(value) => value,
            Err(SourceError::IOError(err)) => return Err(CoreError::IOError(err)),
            Err(err) => {
                let mut message = format!("{err}");
                if let Some(additional_info) = err.additional_info() {
                    message.push_str(&format!(" Additional_info: {additional_info}"));
                }
                log::warn!("{} Skipped.", message);
                statistics.rejected = statistics.rejected.saturating_add(1);
                continue;
            },
        };
        statistics.read = statistics.read.saturating_add(1);

        let record = match parser.process(&frame.raw(), frame.timestamp) {
            Some(value) => value,
            None => {
                log::debug!("Frame of {} bytes dropped.", frame.data.len());
                statistics.dropped = statistics.dropped.saturating_add(1);
                continue;
            },
        };

        if config.pretty_json {
            serde_json::to_writer_pretty(&mut *out, &record)?;
        } else {
            serde_json::to_writer(&mut *out, &record)?;
        }
        writeln!(out)?;

        log::trace!("#{} {}: {}", record.index, record.protocol, record.info);
        statistics.dissected = statistics.dissected.saturating_add(1);
    }

    out.flush()?;
    Ok(statistics)
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("JSON Serialization Error.")]
    JsonSerializationError(#[from] serde_json::Error),
}

impl CoreError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            CoreError::IOError(err) => Some(err.to_string()),
            CoreError::JsonSerializationError(err) => Some(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::HexLineSource;
    use serde_json::Value;
    use std::io::Cursor;

    const ARP_REQUEST: &str = "00 1E 68 51 4F A9 00 1A 8C 10 AD 30 08 06 00 01 08 00 06 04 00 01 00 1A 8C 10 AD 30 AC 10 00 01 00 00 00 00 00 00 AC 10 FF 01";
    const DNS_QUERY: &str = "84 D8 1B 6E C1 4A 04 E8 B9 18 55 10 08 00 45 00 00 44 D2 6E 00 00 80 11 00 00 C0 A8 00 67 C0 A8 00 01 E5 13 00 35 00 30 81 FA F3 31 01 00 00 01 00 00 00 00 00 00 08 64 6F 77 6E 6C 6F 61 64 09 6A 65 74 62 72 61 69 6E 73 03 63 6F 6D 00 00 01 00 01";

    fn run(input: &str, config: &Config) -> (Statistics, Vec<Value>) {
        let mut source = HexLineSource::new(Cursor::new(input.to_string()), config.snapshot_length);
        let mut out: Vec<u8> = Vec::new();

        let statistics = start(&mut source, &mut out, config).unwrap();
        let text = String::from_utf8(out).unwrap();
        let records = serde_json::Deserializer::from_str(&text)
            .into_iter::<Value>()
            .map(|value| value.unwrap())
            .collect();

        (statistics, records)
    }

    #[test]
    fn test_records_are_numbered_per_dissected_frame() {
        let input = format!("# capture\n{ARP_REQUEST}\n00 1A 8C\nnot hex\n{DNS_QUERY}\n");
        let (statistics, records) = run(&input, &Config::default());

        assert_eq!(
            statistics,
            Statistics {
                read: 3,
                dissected: 2,
                dropped: 1,
                rejected: 1,
            }
        );
        assert_eq!(records.len(), 2);

        assert_eq!(records[0]["index"], 1);
        assert_eq!(records[0]["protocol"], "ARP");
        assert_eq!(records[0]["info"], "REQUEST from 172.16.0.1");

        assert_eq!(records[1]["index"], 2);
        assert_eq!(records[1]["protocol"], "DNS");
        assert_eq!(records[1]["length"], 82);
        assert_eq!(records[1]["info"], "QUERY download.jetbrains.com");
        assert_eq!(records[1]["target"], "192.168.0.1:53");
        assert_eq!(records[1]["layers"][0]["name"], "Frame");
    }

    #[test]
    fn test_pretty_output_and_truncation() {
        let config = Config {
            pretty_json: true,
            snapshot_length: 34,
            ..Config::default()
        };
        let mut source = HexLineSource::new(Cursor::new(DNS_QUERY.to_string()), 34);
        let mut out: Vec<u8> = Vec::new();
        start(&mut source, &mut out, &config).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\n  \"index\": 1,"));

        let record: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(record["protocol"], "IP");
        assert_eq!(record["length"], 34);
    }
}
