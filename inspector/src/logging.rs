use crate::config::Config;
use chrono::{Datelike, Local, Timelike};
use log::{LevelFilter, Record};
use std::fmt::Arguments;
use thiserror::Error;

pub const DEFAULT_FORMAT: &str = "[$Y-$m-$D $H:$M $LEVEL] $MESSAGE";

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Logger initialization error.")]
    SetLoggerError(log::SetLoggerError),
}

impl LogError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            LogError::SetLoggerError(err) => Some(err.to_string()),
        }
    }
}

// Records go to stdout, so the log lives on stderr
pub fn setup(config: &Config) -> Result<(), LogError> {
    if config.log_level.eq(&LevelFilter::Off) {
        return Ok(());
    }

    let log_format = config.log_format.clone();
    fern::Dispatch::new()
        .level(config.log_level)
        .format(move |out, message, record| {
            let formatted = parse_format(&log_format, message, record);

            out.finish(format_args!("{}", formatted))
        })
        .chain(std::io::stderr())
        .apply()
        .map_err(LogError::SetLoggerError)
}

// Longer tokens first, so `$MESSAGE` is never read as `$M`
const PLACEHOLDERS: [&str; 9] = [
    "$MESSAGE", "$LEVEL", "$TARGET", "$Y", "$m", "$D", "$H", "$M", "$S",
];

pub fn parse_format(format: &str, message: &Arguments, record: &Record) -> String {
    let time = Local::now();
    let mut log = String::with_capacity(format.len());

    // One left-to-right pass, substituted text is never scanned again
    let mut rest = format.trim();
    while let Some(position) = rest.find('$') {
        log.push_str(&rest[..position]);
        rest = &rest[position..];

        let placeholder = PLACEHOLDERS
            .iter()
            .find(|placeholder| rest.starts_with(**placeholder));
        let placeholder = match placeholder {
            Some(value) => *value,
            None => {
                log.push('$');
                rest = &rest[1..];
                continue;
            },
        };

        let value = match placeholder {
            "$MESSAGE" => message.to_string(),
            "$LEVEL" => record.level().as_str().to_string(),
            "$TARGET" => record.target().to_string(),
            "$Y" => format!("{:0>2}", time.year()),
            "$m" => format!("{:0>2}", time.month()),
            "$D" => format!("{:0>2}", time.day()),
            "$H" => format!("{:0>2}", time.hour()),
            "$M" => format!("{:0>2}", time.minute()),
            _ => format!("{:0>2}", time.second()),
        };
        log.push_str(&value);
        rest = &rest[placeholder.len()..];
    }
    log.push_str(rest);

    log
}
