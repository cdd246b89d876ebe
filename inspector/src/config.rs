use crate::logging;
use log::LevelFilter;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::str::FromStr;
use thiserror::Error;

const CONFIG_FILENAME: &str = "config.toml";

// Same as the usual pcap snaplen
const DEFAULT_SNAPSHOT_LENGTH: usize = 65535;

pub struct Config {
    pub log_format: String,
    pub log_level: LevelFilter,
    pub pretty_json: bool,
    pub snapshot_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_format: logging::DEFAULT_FORMAT.to_string(),
            log_level: LevelFilter::Info,
            pretty_json: false,
            snapshot_length: DEFAULT_SNAPSHOT_LENGTH,
        }
    }
}

impl Serialize for Config {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Config", 4)?;
        state.serialize_field("log_format", &self.log_format)?;
        state.serialize_field("log_level", &self.log_level.to_string())?;
        state.serialize_field("pretty_json", &self.pretty_json)?;
        state.serialize_field("snapshot_length", &self.snapshot_length)?;
        state.end()
    }
}

impl Config {
    pub fn from_file() -> Result<Self, ConfigError> {
        match std::fs::read_to_string(CONFIG_FILENAME) {
            Ok(data) => Self::from_toml(&data),
            Err(_) => {
                let config = Config::default();
                config.save_to_file()?;
                Ok(config)
            },
        }
    }

    pub fn from_toml(data: &str) -> Result<Self, ConfigError> {
        let dto: ConfigDto =
            toml::from_str(data).map_err(ConfigError::TomlDeserializationError)?;
        dto.into_config()
    }

    pub fn save_to_file(&self) -> Result<(), ConfigError> {
        let data = toml::to_string(&self).map_err(ConfigError::TomlSerializationError)?;

        std::fs::write(CONFIG_FILENAME, data).map_err(ConfigError::IOError)?;

        Ok(())
    }
}

#[derive(Deserialize)]
struct ConfigDto {
    log_format: Option<String>,
    log_level: String,
    pretty_json: Option<bool>,
    snapshot_length: Option<usize>,
}

impl ConfigDto {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let snapshot_length = self.snapshot_length.unwrap_or(DEFAULT_SNAPSHOT_LENGTH);
        if snapshot_length == 0 {
            return Err(ConfigError::WrongSnapshotLength);
        }

        let config = Config {
            log_format: self
                .log_format
                .unwrap_or_else(|| logging::DEFAULT_FORMAT.to_string()),
            log_level: LevelFilter::from_str(&self.log_level)
                .map_err(|_| ConfigError::UnknownLogLevel)?,
            pretty_json: self.pretty_json.unwrap_or_default(),
            snapshot_length,
        };

        Ok(config)
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO Error.")]
    IOError(#[from] std::io::Error),

    #[error("TOML Serialization Error.")]
    TomlSerializationError(#[from] toml::ser::Error),

    #[error("TOML Deserialization Error.")]
    TomlDeserializationError(#[from] toml::de::Error),

    #[error("Unknown log level.")]
    UnknownLogLevel,

    #[error("Snapshot length must be positive.")]
    WrongSnapshotLength,
}

impl ConfigError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            ConfigError::IOError(err) => Some(err.to_string()),
            ConfigError::TomlSerializationError(err) => Some(err.to_string()),
            ConfigError::TomlDeserializationError(err) => Some(err.to_string()),
            _ => None,
        }
    }
}
